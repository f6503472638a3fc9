pub mod http;
pub mod jsunnyreports;
pub mod pvoutput_api;
pub mod pvoutput_csv;
pub mod sonnenertrag;

pub use jsunnyreports::JSunnyReportsSink;
pub use pvoutput_api::PvOutputApiSink;
pub use pvoutput_csv::PvOutputCsvSink;
pub use sonnenertrag::SonnenErtragSink;
