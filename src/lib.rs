//! Hierarchical configuration loader.
//!
//! A [`Confinode`] searches the configuration files of an application from
//! a folder upward, or loads a given file. Files may extend other files.
//! Their contents are validated and merged against a [`Description`] of the
//! expected configuration, and every value remembers the file it came from.

pub mod cache;
pub mod cli;
pub mod confinode;
pub mod description;
pub mod error;
pub mod files;
pub mod loader;
pub mod logging;
pub mod messages;
pub mod paths;
pub mod result;

pub use confinode::{Confinode, ConfinodeOptions, FilesOption, Found};
pub use description::{ConfigDescription, Description, ParserContext};
pub use error::{ConfinodeError, Expected};
pub use files::FileDescription;
pub use logging::Logger;
pub use messages::{Level, Message, MessageContent};
pub use result::{ConfigResult, ConfigurationResult, Provenance, ResultFile};
