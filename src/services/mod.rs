// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - ports, provider adapters, and business logic.

pub mod firebase_auth;
pub mod identity;
pub mod push;
pub mod roles;
pub mod webauthn;

pub use firebase_auth::FirebaseAuth;
pub use identity::{IdentityError, IdentityProvider, InMemoryIdentityProvider, VerifiedIdentity};
pub use push::{Audience, OneSignalSender, PushError, PushMessage, PushSender, RecordingPushSender};
pub use roles::{RoleResolution, RoleResolver};
