use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("usage error: {0}")]
    Usage(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("malformed record document: {0}")]
    Structure(#[from] fhir::FhirError),
    #[error("failed to read records from {path}: {source}", path = path.display())]
    RecordRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse record {name}: {source}")]
    RecordParse {
        name: String,
        #[source]
        source: fhir::FhirError,
    },
    #[error("failed to read condition catalogue {path}: {source}", path = path.display())]
    CatalogueRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse condition catalogue: {0}")]
    CatalogueParse(fhir::FhirError),
    #[error("failed to read configuration file: {0}")]
    ConfigRead(std::io::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("failed to serialize request: {0}")]
    RequestSerialization(serde_json::Error),
    #[error("service returned an unparseable result set: {0}")]
    MalformedResponse(fhir::FhirError),
    #[error("unclassified transport failure: {0}")]
    Transport(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),
    #[error("unit already recorded: {0}")]
    DuplicateUnit(String),
    #[error("failed to create results directory: {0}")]
    ResultsDirCreation(std::io::Error),
    #[error("failed to write CSV report {path}: {source}", path = path.display())]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write workbook {path}: {source}", path = path.display())]
    WorkbookWrite {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}

pub type SweepResult<T> = std::result::Result<T, SweepError>;
