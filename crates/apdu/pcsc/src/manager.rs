//! Device manager for PC/SC operations

use pcsc::{Context, Scope};
use tracing::debug;

use crate::config::{ConnectStrategy, PcscConfig};
use crate::error::PcscError;
use crate::reader::PcscReader;
use crate::transport::PcscTransport;

/// Entry point for reader discovery and transport creation
#[allow(missing_debug_implementations)]
pub struct PcscDeviceManager {
    context: Context,
}

impl PcscDeviceManager {
    /// Establish a user-scope PC/SC context
    pub fn new() -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List all available card readers with their card presence
    pub fn list_readers(&self) -> Result<Vec<PcscReader>, PcscError> {
        let readers = match self.context.list_readers_owned() {
            Ok(readers) => readers,
            Err(pcsc::Error::NoReadersAvailable) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        if readers.is_empty() {
            return Err(PcscError::NoReadersAvailable);
        }

        let mut result = Vec::with_capacity(readers.len());

        for reader_name in readers {
            let mut reader_states = vec![pcsc::ReaderState::new(
                reader_name.as_c_str(),
                pcsc::State::UNAWARE,
            )];

            match self.context.get_status_change(None, &mut reader_states) {
                Ok(()) => result.push(PcscReader::from_reader_state(&reader_states[0])),
                Err(e) => {
                    debug!(reader = ?reader_name, error = %e, "Reader status unavailable");
                    let name = reader_name.to_string_lossy().into_owned();
                    result.push(PcscReader::new(name, None));
                }
            }
        }

        Ok(result)
    }

    /// Open a transport on a specific reader
    pub fn open_reader(&self, reader_name: &str) -> Result<PcscTransport, PcscError> {
        self.open_reader_with_config(reader_name, PcscConfig::default())
    }

    /// Open a transport on a specific reader with custom configuration
    pub fn open_reader_with_config(
        &self,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<PcscTransport, PcscError> {
        PcscTransport::new(self.context.clone(), reader_name, config)
    }

    /// Pick a reader using the given strategy and open a transport on it
    pub fn connect_strategy(
        &self,
        strategy: ConnectStrategy,
        config: PcscConfig,
    ) -> Result<PcscTransport, PcscError> {
        match strategy {
            ConnectStrategy::Reader(name) => self.open_reader_with_config(&name, config),
            ConnectStrategy::AnyCard => {
                let reader = self
                    .list_readers()?
                    .into_iter()
                    .find(PcscReader::has_card)
                    .ok_or_else(|| PcscError::NoCard("No reader with card found".to_string()))?;
                self.open_reader_with_config(reader.name(), config)
            }
            ConnectStrategy::CardWithAtr(pattern, mask) => {
                let reader = self
                    .list_readers()?
                    .into_iter()
                    .find(|reader| reader.atr_matches(&pattern, mask.as_deref()))
                    .ok_or_else(|| {
                        PcscError::NoCard("No card with matching ATR found".to_string())
                    })?;
                self.open_reader_with_config(reader.name(), config)
            }
            ConnectStrategy::FirstAvailable => {
                let readers = self.list_readers()?;
                let reader = readers.first().ok_or(PcscError::NoReadersAvailable)?;
                self.open_reader_with_config(reader.name(), config)
            }
        }
    }
}
