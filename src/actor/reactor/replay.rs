use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::Context;
#[cfg(test)]
use tempfile::NamedTempFile;
use tracing::warn;

use super::{Event, Reactor};
use crate::common::config::Config;
use crate::sys::geometry::Size;
use crate::sys::host::GridCanvas;
use crate::sys::store::KeyValueStore;

/// Event log: the config on the first line, the screen size on the second,
/// then one RON-encoded [`Event`] per line.
pub struct Record {
    file: Option<File>,
    #[cfg(test)]
    temp: Option<NamedTempFile>,
}

impl Record {
    pub fn new(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => Some(
                File::create(path)
                    .with_context(|| format!("creating record file {}", path.display()))?,
            ),
            None => None,
        };
        Ok(Self {
            file,
            #[cfg(test)]
            temp: None,
        })
    }

    pub fn disabled() -> Self {
        Self {
            file: None,
            #[cfg(test)]
            temp: None,
        }
    }

    #[cfg(test)]
    pub fn new_for_test(temp: NamedTempFile) -> Self { Self { file: None, temp: Some(temp) } }

    fn file(&mut self) -> Option<&mut File> {
        #[cfg(test)]
        return self.file.as_mut().or(self.temp.as_mut().map(|temp| temp.as_file_mut()));
        #[cfg(not(test))]
        self.file.as_mut()
    }

    pub(super) fn start(&mut self, config: &Config, screen: Size) {
        let Some(file) = self.file() else { return };
        if let Err(e) = write_header(file, config, screen) {
            warn!("recording header failed: {e:#}");
        }
    }

    pub(super) fn on_event(&mut self, event: &Event) {
        let Some(file) = self.file() else { return };
        let result = ron::ser::to_string(event)
            .map_err(anyhow::Error::from)
            .and_then(|line| writeln!(file, "{line}").map_err(anyhow::Error::from));
        if let Err(e) = result {
            warn!("recording event failed: {e:#}");
        }
    }
}

fn write_header(file: &mut File, config: &Config, screen: Size) -> anyhow::Result<()> {
    let config = ron::ser::to_string(config)?;
    let screen = ron::ser::to_string(&screen)?;
    writeln!(file, "{config}\n{screen}")?;
    Ok(())
}

/// Re-drives a fresh reactor with a recorded event log against a
/// [`GridCanvas`] built from the recorded config. Pending saves are flushed
/// before the reactor is returned.
pub fn replay(path: &Path, store: Box<dyn KeyValueStore>) -> anyhow::Result<Reactor> {
    let file = BufReader::new(
        File::open(path).with_context(|| format!("opening record file {}", path.display()))?,
    );
    let mut lines = file.lines();
    let config: Config = ron::de::from_str(&lines.next().context("empty record file")??)
        .context("parsing recorded config")?;
    let screen: Size = ron::de::from_str(&lines.next().context("missing screen size line")??)
        .context("parsing recorded screen size")?;

    let host = GridCanvas::from_settings(&config.settings.host);
    let mut reactor = Reactor::new(config, Box::new(host), screen, store, Record::disabled(), None);
    for (index, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event = ron::de::from_str(&line)
            .with_context(|| format!("parsing event on line {}", index + 3))?;
        reactor.handle_event(event);
    }
    reactor.flush()?;
    Ok(reactor)
}
