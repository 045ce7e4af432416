use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::{KeyStatus, KeySurface, Notice};
use crate::secret::HexView;
use crate::types::Ack;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Banner { index: usize, total: usize },
    Progress,
    Key { index: usize },
    Masked { index: usize, status: KeyStatus },
    Notice(Notice),
    Ack(Ack),
    Reset,
}

/// Headless surface: answers prompts from a script and records what it was
/// asked to show. Once the script runs out, `acknowledge` waits forever, like
/// a user who walked away.
#[derive(Default)]
pub struct ScriptedSurface {
    acks: VecDeque<Ack>,
    events: Vec<SurfaceEvent>,
    shown: Vec<Zeroizing<String>>,
}

impl ScriptedSurface {
    pub fn new(acks: impl IntoIterator<Item = Ack>) -> Self {
        Self { acks: acks.into_iter().collect(), ..Self::default() }
    }

    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    /// Hex renderings in display order.
    pub fn shown_keys(&self) -> Vec<&str> {
        self.shown.iter().map(|s| s.as_str()).collect()
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Notice(Notice::Warning(w)) => Some(w.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl KeySurface for ScriptedSurface {
    fn banner(&mut self, index: usize, total: usize) -> io::Result<()> {
        self.events.push(SurfaceEvent::Banner { index, total });
        Ok(())
    }

    async fn progress(&mut self) -> io::Result<()> {
        self.events.push(SurfaceEvent::Progress);
        Ok(())
    }

    fn show_key(&mut self, index: usize, key: &HexView) -> io::Result<()> {
        self.shown.push(Zeroizing::new(key.as_str().to_owned()));
        self.events.push(SurfaceEvent::Key { index });
        Ok(())
    }

    fn show_masked(&mut self, index: usize, _masked: &str, status: KeyStatus) -> io::Result<()> {
        self.events.push(SurfaceEvent::Masked { index, status });
        Ok(())
    }

    fn notice(&mut self, notice: Notice) -> io::Result<()> {
        self.events.push(SurfaceEvent::Notice(notice));
        Ok(())
    }

    async fn acknowledge(&mut self) -> io::Result<Ack> {
        match self.acks.pop_front() {
            Some(ack) => {
                self.events.push(SurfaceEvent::Ack(ack));
                Ok(ack)
            }
            None => std::future::pending().await,
        }
    }

    fn reset(&mut self) -> io::Result<()> {
        self.events.push(SurfaceEvent::Reset);
        Ok(())
    }
}
