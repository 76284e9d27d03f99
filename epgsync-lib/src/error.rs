use std::str::Utf8Error;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error(transparent)]
    Utf8Error(#[from] Utf8Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error("invalid attribute: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
