//! Ticket and prefetch-slot bookkeeping between the window and the loader.
//!
//! Every decode request gets a fresh ticket. Only the reply to the newest
//! show request may reach the screen, and the single prefetch slot holds at
//! most one decoded slide for the current viewport and traversal mode.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::loader::{DecodeRequest, LoaderReply, PreparedImage, Purpose};
use crate::playback::Mode;

#[derive(Debug)]
struct Pending {
    ticket: u64,
    path: PathBuf,
    /// Re-decode of the slide already on screen after a resize.
    refit: bool,
}

/// What the window should do with a loader reply.
#[derive(Debug)]
pub enum Outcome {
    /// Put the slide on screen. A refit swaps it in place without a fade.
    Present { image: PreparedImage, refit: bool },
    /// The wanted slide could not be decoded.
    Failed(PathBuf),
    /// Decoded ahead of time and kept in the slot.
    Stored,
    /// Superseded or unknown ticket.
    Ignored,
}

#[derive(Debug)]
pub struct SlideRequests {
    next_ticket: u64,
    wanted: Option<Pending>,
    prefetching: Option<(u64, PathBuf)>,
    prefetched: Option<PreparedImage>,
    on_screen: Option<PathBuf>,
    mode: Mode,
}

impl SlideRequests {
    #[must_use]
    pub const fn new(mode: Mode) -> Self {
        Self {
            next_ticket: 0,
            wanted: None,
            prefetching: None,
            prefetched: None,
            on_screen: None,
            mode,
        }
    }

    #[must_use]
    pub fn on_screen(&self) -> Option<&Path> {
        self.on_screen.as_deref()
    }

    /// True when `path` is already displayed and no other slide is on its way.
    #[must_use]
    pub fn is_settled_on(&self, path: &Path) -> bool {
        self.wanted.is_none() && self.on_screen.as_deref() == Some(path)
    }

    /// Record the traversal mode; a change discards the prefetched slide.
    pub fn note_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            self.mode = mode;
            self.drop_prefetch();
        }
    }

    /// The viewport changed, so nothing decoded ahead of time fits any more.
    pub fn drop_prefetch(&mut self) {
        self.prefetched = None;
        self.prefetching = None;
    }

    /// Nothing to show: forget the wanted slide and what was on screen.
    pub fn clear(&mut self) {
        self.wanted = None;
        self.on_screen = None;
    }

    /// Hand out the prefetched slide when it is `path` decoded for `viewport`.
    /// A hit cancels any show request still in flight.
    pub fn take_prefetched(&mut self, path: &Path, viewport: (u32, u32)) -> Option<PreparedImage> {
        let image = self
            .prefetched
            .take_if(|img| img.path == path && img.viewport == viewport)?;
        self.wanted = None;
        Some(image)
    }

    /// Ask for `path` to go on screen, superseding any earlier show request.
    pub fn show(&mut self, path: PathBuf, viewport: (u32, u32)) -> DecodeRequest {
        self.want(path, viewport, false)
    }

    /// Re-decode the slide on screen for a new viewport, provided it is still
    /// `current` and no different slide has been asked for meanwhile.
    pub fn refit(&mut self, current: &Path, viewport: (u32, u32)) -> Option<DecodeRequest> {
        let on_screen = self.on_screen.clone().filter(|p| p == current)?;
        if self.wanted.as_ref().is_some_and(|w| !w.refit) {
            return None;
        }
        Some(self.want(on_screen, viewport, true))
    }

    /// Decode `next` into the slot unless it is already held or on its way.
    pub fn prefetch(&mut self, next: PathBuf, viewport: (u32, u32)) -> Option<DecodeRequest> {
        let held = self
            .prefetched
            .as_ref()
            .map(|img| &img.path)
            .or(self.prefetching.as_ref().map(|(_, p)| p));
        if held == Some(&next) {
            return None;
        }
        self.prefetched = None;
        let ticket = self.issue();
        self.prefetching = Some((ticket, next.clone()));
        Some(DecodeRequest {
            ticket,
            path: next,
            viewport,
            purpose: Purpose::Prefetch,
        })
    }

    /// A request never reached the loader.
    pub fn forget(&mut self, ticket: u64) {
        self.wanted.take_if(|w| w.ticket == ticket);
        self.prefetching.take_if(|(t, _)| *t == ticket);
    }

    pub fn presented(&mut self, path: PathBuf) {
        self.on_screen = Some(path);
    }

    /// Match a loader reply against the outstanding tickets.
    pub fn accept(&mut self, reply: LoaderReply) -> Outcome {
        let ticket = reply.ticket();
        match reply {
            LoaderReply::Ready {
                purpose: Purpose::Show,
                image,
                ..
            } => match self.wanted.take_if(|w| w.ticket == ticket) {
                Some(pending) => Outcome::Present {
                    image,
                    refit: pending.refit,
                },
                None => {
                    trace!(ticket, "stale slide dropped");
                    Outcome::Ignored
                }
            },
            LoaderReply::Ready {
                purpose: Purpose::Prefetch,
                image,
                ..
            } => {
                if self.prefetching.take_if(|(t, _)| *t == ticket).is_none() {
                    return Outcome::Ignored;
                }
                trace!(path = %image.path.display(), "prefetch stored");
                self.prefetched = Some(image);
                Outcome::Stored
            }
            LoaderReply::Failed {
                purpose: Purpose::Show,
                error,
                ..
            } => match self.wanted.take_if(|w| w.ticket == ticket) {
                Some(pending) => Outcome::Failed(pending.path),
                None => {
                    trace!(ticket, %error, "stale failure dropped");
                    Outcome::Ignored
                }
            },
            LoaderReply::Failed {
                purpose: Purpose::Prefetch,
                error,
                ..
            } => {
                if self.prefetching.take_if(|(t, _)| *t == ticket).is_some() {
                    debug!(%error, "prefetch failed");
                }
                Outcome::Ignored
            }
        }
    }

    fn want(&mut self, path: PathBuf, viewport: (u32, u32), refit: bool) -> DecodeRequest {
        let ticket = self.issue();
        self.wanted = Some(Pending {
            ticket,
            path: path.clone(),
            refit,
        });
        DecodeRequest {
            ticket,
            path,
            viewport,
            purpose: Purpose::Show,
        }
    }

    fn issue(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }
}
