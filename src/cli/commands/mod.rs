pub mod completions;
pub mod create;
pub mod delete;
pub mod export_xml;
pub mod get;
pub mod import_xml;
pub mod info;
pub mod keyfile;
pub mod list;
pub mod set;
