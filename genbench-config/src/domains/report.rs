//! Report generation configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Informational notes about known tool limitations, rendered in the summary
    #[serde(default = "default_caveats")]
    pub caveats: Vec<String>,

    /// Also write the long-form `detailed-metrics.csv`
    #[serde(default = "crate::domains::utils::default_true")]
    pub detailed_csv: bool,

    /// Write per-endpoint `run-averages.txt` next to the JSON aggregate
    #[serde(default = "crate::domains::utils::default_true")]
    pub endpoint_text_summary: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            caveats: default_caveats(),
            detailed_csv: true,
            endpoint_text_summary: true,
        }
    }
}

impl Validatable for ReportConfig {
    fn validate(&self) -> ConfigResult<()> {
        for caveat in &self.caveats {
            validate_required_string(caveat, "caveats[]", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "report"
    }
}

fn default_caveats() -> Vec<String> {
    vec![
        "EvoSuite runs the generated code in a separate client JVM and passes values over RMI; \
         endpoints whose signatures use Spring web types such as HttpEntity or ResponseEntity \
         commonly fail with RMI_SERIALIZATION regardless of the endpoint's own behaviour."
            .to_string(),
        "Coverage is only available when the tool writes its statistics report; \
         N/A marks runs where it did not."
            .to_string(),
    ]
}
