//! # Built-in plugins
//!
//! Each plugin contributes its node/mark types, the commands that work on
//! them, toolbar items and keybindings. [`CorePlugin`] supplies the
//! document skeleton every editor needs and is always registered first.

mod base;
mod blockquote;
mod code_block;
mod formatting;
mod heading;
mod history;
mod image;
mod link;
mod table;

use std::sync::Arc;

use crate::plugin::Plugin;

pub use self::base::CorePlugin;
pub use self::blockquote::BlockquotePlugin;
pub use self::code_block::CodeBlockPlugin;
pub use self::formatting::FormattingPlugin;
pub use self::heading::HeadingPlugin;
pub use self::history::HistoryPlugin;
pub use self::image::ImagePlugin;
pub use self::link::LinkPlugin;
pub use self::table::TablePlugin;

/// Every built-in plugin except [`CorePlugin`], in registration order
pub fn default_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(HistoryPlugin),
        Arc::new(FormattingPlugin),
        Arc::new(LinkPlugin),
        Arc::new(HeadingPlugin),
        Arc::new(BlockquotePlugin),
        Arc::new(CodeBlockPlugin),
        Arc::new(ImagePlugin),
        Arc::new(TablePlugin),
    ]
}

/// Look a plugin up by its name
pub fn by_name(name: &str) -> Option<Arc<dyn Plugin>> {
    let plugin: Arc<dyn Plugin> = match name {
        "core" => Arc::new(CorePlugin),
        "history" => Arc::new(HistoryPlugin),
        "formatting" => Arc::new(FormattingPlugin),
        "link" => Arc::new(LinkPlugin),
        "heading" => Arc::new(HeadingPlugin),
        "blockquote" => Arc::new(BlockquotePlugin),
        "codeBlock" => Arc::new(CodeBlockPlugin),
        "image" => Arc::new(ImagePlugin),
        "table" => Arc::new(TablePlugin),
        _ => return None,
    };
    Some(plugin)
}
