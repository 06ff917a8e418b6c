//! Endpoint catalog loading and lookup

use crate::error::{CatalogError, InvalidEndpointError};
use crate::types::{Authorization, HttpMethod};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// One target endpoint under benchmark. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub id: u32,
    pub service: String,
    pub path: String,
    pub http_method: HttpMethod,
    /// Fully qualified handler class the tool is pointed at
    pub controller_class: String,
    pub method_name: String,
    pub path_params: Vec<String>,
    pub has_request_body: bool,
    pub expected_status_codes: Vec<u16>,
    pub authorization: Authorization,
}

impl EndpointDescriptor {
    /// Class name without its package
    pub fn simple_class_name(&self) -> &str {
        self.controller_class
            .rsplit('.')
            .next()
            .unwrap_or(&self.controller_class)
    }

    /// `METHOD /path` label for reports
    pub fn route(&self) -> String {
        format!("{} {}", self.http_method, self.path)
    }
}

/// Raw catalog row as it appears in the CSV source
#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: String,
    service: String,
    path: String,
    http_method: String,
    controller_class: String,
    method_name: String,
    #[serde(default)]
    path_params: String,
    #[serde(default)]
    has_request_body: String,
    #[serde(default)]
    expected_status_codes: String,
    #[serde(default)]
    authorization: String,
}

/// Ordered, dense set of endpoint descriptors
#[derive(Debug, Clone)]
pub struct Catalog {
    endpoints: Vec<EndpointDescriptor>,
}

impl Catalog {
    /// Load the catalog from a CSV file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CatalogError::Missing(path.to_path_buf()));
        }
        let file = std::fs::File::open(path).map_err(csv::Error::from)?;
        let catalog = Self::from_reader(file)?;
        tracing::debug!(
            "Loaded {} endpoints from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse a catalog from any CSV source with a header row
    pub fn from_reader<R: Read>(source: R) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(source);
        let headers = reader.headers()?.clone();

        let mut seen: HashMap<u32, u64> = HashMap::new();
        let mut endpoints = Vec::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let row: CatalogRow = record
                .deserialize(Some(&headers))
                .map_err(|e| malformed(line, e.to_string()))?;
            let endpoint = parse_row(row, line)?;

            if seen.insert(endpoint.id, line).is_some() {
                return Err(CatalogError::DuplicateId {
                    id: endpoint.id,
                    line,
                });
            }
            endpoints.push(endpoint);
        }

        if endpoints.is_empty() {
            return Err(CatalogError::Empty);
        }

        endpoints.sort_by_key(|e| e.id);
        for (index, endpoint) in endpoints.iter().enumerate() {
            let expected = index as u32 + 1;
            if endpoint.id != expected {
                return Err(CatalogError::NonDenseIds {
                    expected,
                    found: endpoint.id,
                });
            }
        }

        Ok(Self { endpoints })
    }

    /// Look up an endpoint by id
    pub fn lookup(&self, id: u32) -> Result<&EndpointDescriptor, InvalidEndpointError> {
        id.checked_sub(1)
            .and_then(|index| self.endpoints.get(index as usize))
            .ok_or(InvalidEndpointError {
                id,
                max: self.max_id(),
            })
    }

    /// Endpoints to process: all of them, or a single validated one
    pub fn select(&self, only: Option<u32>) -> Result<Vec<&EndpointDescriptor>, InvalidEndpointError> {
        match only {
            Some(id) => Ok(vec![self.lookup(id)?]),
            None => Ok(self.endpoints.iter().collect()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn max_id(&self) -> u32 {
        self.endpoints.len() as u32
    }
}

fn malformed(line: u64, message: impl Into<String>) -> CatalogError {
    CatalogError::Malformed {
        line,
        message: message.into(),
    }
}

fn parse_row(row: CatalogRow, line: u64) -> Result<EndpointDescriptor, CatalogError> {
    let id: u32 = row
        .id
        .parse()
        .map_err(|_| malformed(line, format!("id '{}' is not a positive integer", row.id)))?;
    if id == 0 {
        return Err(malformed(line, "id must start at 1"));
    }

    for (field, value) in [
        ("service", &row.service),
        ("path", &row.path),
        ("controller_class", &row.controller_class),
        ("method_name", &row.method_name),
    ] {
        if value.is_empty() {
            return Err(malformed(line, format!("{} cannot be empty", field)));
        }
    }

    let http_method =
        HttpMethod::from_str(&row.http_method).map_err(|e| malformed(line, e.to_string()))?;
    let authorization =
        Authorization::from_str(&row.authorization).map_err(|e| malformed(line, e.to_string()))?;
    let has_request_body = parse_flag(&row.has_request_body)
        .ok_or_else(|| malformed(line, format!("has_request_body '{}' is not a boolean", row.has_request_body)))?;

    let expected_status_codes = split_list(&row.expected_status_codes)
        .map(|code| {
            code.parse::<u16>()
                .ok()
                .filter(|c| (100..=599).contains(c))
                .ok_or_else(|| malformed(line, format!("invalid status code '{}'", code)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EndpointDescriptor {
        id,
        service: row.service,
        path: row.path,
        http_method,
        controller_class: row.controller_class,
        method_name: row.method_name,
        path_params: split_list(&row.path_params).map(str::to_string).collect(),
        has_request_body,
        expected_status_codes,
        authorization,
    })
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split([';', '|', ','])
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "false" | "no" | "0" => Some(false),
        "true" | "yes" | "1" => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,service,path,http_method,controller_class,method_name,path_params,has_request_body,expected_status_codes,authorization\n";

    fn catalog_from(rows: &str) -> Result<Catalog, CatalogError> {
        Catalog::from_reader(format!("{}{}", HEADER, rows).as_bytes())
    }

    #[test]
    fn test_load_sorts_and_parses_rows() {
        let catalog = catalog_from(
            "2,auth,/api/v1/users/login,POST,com.example.auth.UserController,getToken,,true,200;401,none\n\
             1,route,/api/v1/routes/{start}/{end},GET,com.example.route.RouteController,query,start|end,false,200,ROLE_USER\n",
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        let first = catalog.lookup(1).unwrap();
        assert_eq!(first.service, "route");
        assert_eq!(first.path_params, vec!["start", "end"]);
        assert_eq!(first.authorization, Authorization::User);
        assert_eq!(first.simple_class_name(), "RouteController");

        let second = catalog.lookup(2).unwrap();
        assert!(second.has_request_body);
        assert_eq!(second.expected_status_codes, vec![200, 401]);
        assert_eq!(second.route(), "POST /api/v1/users/login");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = catalog_from(
            "1,a,/a,GET,com.A,a,,false,200,none\n\
             1,b,/b,GET,com.B,b,,false,200,none\n",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId { id: 1, line: 3 }));
    }

    #[test]
    fn test_gap_in_ids_rejected() {
        let err = catalog_from(
            "1,a,/a,GET,com.A,a,,false,200,none\n\
             3,b,/b,GET,com.B,b,,false,200,none\n",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::NonDenseIds { expected: 2, found: 3 }));
    }

    #[test]
    fn test_malformed_rows_rejected() {
        assert!(matches!(
            catalog_from("x,a,/a,GET,com.A,a,,false,200,none\n").unwrap_err(),
            CatalogError::Malformed { line: 2, .. }
        ));
        assert!(matches!(
            catalog_from("1,a,/a,BREW,com.A,a,,false,200,none\n").unwrap_err(),
            CatalogError::Malformed { .. }
        ));
        assert!(matches!(
            catalog_from("1,a,/a,GET,com.A,a,,maybe,200,none\n").unwrap_err(),
            CatalogError::Malformed { .. }
        ));
        assert!(matches!(
            catalog_from("1,a,/a,GET,com.A,a,,false,999,none\n").unwrap_err(),
            CatalogError::Malformed { .. }
        ));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(catalog_from("").unwrap_err(), CatalogError::Empty));
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("endpoints.csv");
        std::fs::write(
            &path,
            format!(
                "{}# staging endpoints\n1,contacts,/api/v1/contacts,GET,com.example.ContactsController,list,,no,200,none\n",
                HEADER
            ),
        )
        .unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.max_id(), 1);
        assert_eq!(catalog.lookup(1).unwrap().simple_class_name(), "ContactsController");

        let err = Catalog::load(temp.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::Missing(p) if p.ends_with("absent.csv")));

        // A directory is not a catalog
        assert!(matches!(
            Catalog::load(temp.path()).unwrap_err(),
            CatalogError::Missing(_)
        ));
    }

    #[test]
    fn test_lookup_out_of_range() {
        let catalog = catalog_from("1,a,/a,GET,com.A,a,,false,200,none\n").unwrap();
        assert_eq!(
            catalog.lookup(14).unwrap_err(),
            InvalidEndpointError { id: 14, max: 1 }
        );
        assert!(catalog.lookup(0).is_err());
        assert_eq!(catalog.select(None).unwrap().len(), 1);
        assert!(catalog.select(Some(2)).is_err());
    }

    #[test]
    fn test_bundled_catalog_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/endpoints.csv");
        let catalog = Catalog::load(path).unwrap();
        assert_eq!(catalog.len(), 13);
        assert!(catalog.lookup(7).is_ok());
        assert_eq!(
            catalog.lookup(14).unwrap_err(),
            InvalidEndpointError { id: 14, max: 13 }
        );
    }
}
