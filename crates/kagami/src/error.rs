use thiserror::Error;

#[derive(Error, Debug)]
pub enum KagamiError {
    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error("Invalid MPD manifest: {0}")]
    MpdParsing(String),

    #[error("Template uses ${variable}$ but no value is available: {template}")]
    MissingTemplateValue {
        variable: &'static str,
        template: String,
    },

    #[error("SegmentTemplate for representation {0:?} is $Number$-based without a timeline; the manifest does not carry the segment count, supply it with --segment-count")]
    MissingSegmentCount(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    MpdParseError(#[from] dash_mpd::DashMpdError),
}

pub type KagamiResult<T> = Result<T, KagamiError>;
