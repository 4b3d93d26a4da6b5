// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

use std::sync::Arc;

use crate::{identity::IdentityService, notify::Notifier, storage::Store};

/// Shared handles injected into every handler and the auth gate.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityService>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityService>,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
        }
    }
}
