//! Connectivity gating for client operations.
//!
//! Every client operation asks a [`ConnectivityProbe`] first and fails with
//! [`Failure::NoInternetConnection`](crate::error::Failure::NoInternetConnection)
//! without touching the backend when the probe reports [`Connectivity::Offline`].
//! How reachability is actually determined is up to the implementation.

use async_trait::async_trait;
use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Result of a connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

impl From<bool> for Connectivity {
    fn from(online: bool) -> Self {
        if online { Connectivity::Online } else { Connectivity::Offline }
    }
}

/// Reports whether the backend is worth calling.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync + Debug {
    async fn check_connection(&self) -> Connectivity;
}

#[async_trait]
impl<P> ConnectivityProbe for Arc<P>
where
    P: ConnectivityProbe + ?Sized,
{
    async fn check_connection(&self) -> Connectivity {
        (**self).check_connection().await
    }
}

/// A probe that always reports [`Connectivity::Online`]; the client default.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

#[async_trait]
impl ConnectivityProbe for AlwaysOnline {
    async fn check_connection(&self) -> Connectivity {
        Connectivity::Online
    }
}

/// A probe backed by a shared flag.
///
/// Clones share the flag, so a shell can flip connectivity for every client
/// built from the same probe.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    online: Arc<AtomicBool>,
}

impl StaticProbe {
    pub fn new(connectivity: Connectivity) -> Self {
        Self { online: Arc::new(AtomicBool::new(connectivity.is_online())) }
    }

    pub fn online() -> Self {
        Self::new(Connectivity::Online)
    }

    pub fn offline() -> Self {
        Self::new(Connectivity::Offline)
    }

    pub fn set(&self, connectivity: Connectivity) {
        self.online.store(connectivity.is_online(), Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn check_connection(&self) -> Connectivity {
        self.online.load(Ordering::SeqCst).into()
    }
}
