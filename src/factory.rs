// SPDX-License-Identifier: PMPL-1.0-or-later

//! Builds the services from one [`Config`] and wires them together.

use crate::config::Config;
use crate::error::Result;
use crate::error_handler::{install_panic_hook, ErrorHandler, ErrorSink};
use crate::events::EventManager;
use crate::i18n::LanguageManager;
use crate::messages::MessageManager;
use crate::profiler::DebugProfiler;
use std::sync::Arc;

/// The configured services of one process.
///
/// The event manager is shared with the error handler, which fires
/// [`ERROR_EVENT`](crate::error_handler::ERROR_EVENT) through it. The
/// language manager reports missing translations to the error handler.
pub struct SmartFactory {
    pub events: Arc<EventManager>,
    pub error_handler: Arc<ErrorHandler>,
    /// Present when `log.log_path` names a directory.
    pub profiler: Option<DebugProfiler>,
    pub messages: MessageManager,
    pub languages: LanguageManager,
}

impl SmartFactory {
    pub fn from_config(config: &Config) -> Result<Self> {
        let events = Arc::new(EventManager::new());
        let log_path = config.log.log_path.as_str();

        let mut handler = if log_path.is_empty() {
            ErrorHandler::unconfigured(Some(Arc::clone(&events)))
        } else {
            ErrorHandler::new(log_path, Some(Arc::clone(&events)))?
        };
        handler = handler.with_web_output(config.web);

        let source_root = std::env::current_dir().ok();
        if let Some(root) = &source_root {
            handler = handler.with_source_root(root.clone());
        }
        let error_handler = Arc::new(handler);

        let profiler = if log_path.is_empty() || log_path == "stdout" {
            None
        } else {
            let profiler = DebugProfiler::new(log_path, config.log.write_source_file_and_line)?;
            Some(match source_root {
                Some(root) => profiler.with_source_root(root),
                None => profiler,
            })
        };

        let sink: Arc<dyn ErrorSink> = error_handler.clone();
        let languages = LanguageManager::new(config.localization.clone()).with_error_sink(sink);

        tracing::debug!(
            log_path = %log_path,
            localization_path = %config.localization.localization_path,
            "services configured"
        );

        Ok(Self {
            events,
            error_handler,
            profiler,
            messages: MessageManager::new(config.messages.clone()),
            languages,
        })
    }

    /// Route panics of this process to the error handler.
    pub fn install_panic_hook(&self) {
        install_panic_hook(self.error_handler.clone());
    }

    /// Record the request URI on every service that reports it.
    pub fn set_request_uri(&mut self, uri: Option<&str>) {
        self.error_handler.set_request_uri(uri.map(str::to_string));
        if let Some(profiler) = &mut self.profiler {
            profiler.set_request_uri(uri.map(str::to_string));
        }
    }
}
