use thiserror::Error;

#[derive(Error, Debug)]
pub enum FluxPowerError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid extraction parameter: {0}")]
    InvalidExtractionParameter(String),

    #[error("Unsupported physics: {0}")]
    PhysicsUnsupported(String),

    #[error("Value {value} outside the interpolation range [{min}, {max}]")]
    RangeError { value: f64, min: f64, max: f64 },

    #[error("Unknown emulator parameter: {0}")]
    UnknownParameter(String),

    #[error("External collaborator failed: {0}")]
    ExternalFailure(String),

    #[error("Invalid simulation parameter file: {0}")]
    ParamFileError(String),

    #[error("Inconsistent dataset: {0}")]
    InconsistentData(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON (de)serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl PartialEq for FluxPowerError {
    fn eq(&self, other: &Self) -> bool {
        use FluxPowerError::*;
        match (self, other) {
            (ConfigurationError(a), ConfigurationError(b)) => a == b,
            (InvalidExtractionParameter(a), InvalidExtractionParameter(b)) => a == b,
            (PhysicsUnsupported(a), PhysicsUnsupported(b)) => a == b,
            (
                RangeError {
                    value: v1,
                    min: lo1,
                    max: hi1,
                },
                RangeError {
                    value: v2,
                    min: lo2,
                    max: hi2,
                },
            ) => v1 == v2 && lo1 == lo2 && hi1 == hi2,
            (UnknownParameter(a), UnknownParameter(b)) => a == b,
            (ExternalFailure(a), ExternalFailure(b)) => a == b,
            (ParamFileError(a), ParamFileError(b)) => a == b,
            (InconsistentData(a), InconsistentData(b)) => a == b,

            // not comparable: same variant is enough
            (IoError(_), IoError(_)) => true,
            (JsonError(_), JsonError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (TomlError(_), TomlError(_)) => true,

            _ => false,
        }
    }
}
