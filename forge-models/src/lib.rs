//! Credential vault, provider gateway and model profiles for forge.
//!
//! This crate provides:
//! - An encrypted credential vault keyed by a passphrase or device fingerprint
//! - A gateway that speaks to OpenAI, Anthropic and Gemini through one contract
//! - Capability profiles for target video models, with validation
//! - Cleanup of raw model output
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  ProviderGateway                     │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  │
//! │  │   OpenAI    │  │  Anthropic  │  │   Gemini    │  │
//! │  │   codec     │  │   codec     │  │   codec     │  │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  │
//! └─────────────────────────────────────────────────────┘
//!          │                                 │
//!          ▼                                 ▼
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │   CredentialVault    │      │ ModelProfileRegistry │
//! │ (PBKDF2 + AES-GCM)   │      │  (static profiles)   │
//! └──────────────────────┘      └──────────────────────┘
//!          │
//!          ▼
//! ┌──────────────────────┐
//! │      BlobStore       │
//! │ (file/keyring/memory)│
//! └──────────────────────┘
//! ```

mod error;
mod types;

pub mod activity;
pub mod auth;
pub mod gateway;
pub mod providers;
pub mod registry;
pub mod sanitize;
pub mod storage;
pub mod vault;

pub use error::{Error, ProviderError, ProviderErrorKind, Result, VaultError};
pub use gateway::{GenerateOptions, ProviderGateway, StoreStatus};
pub use registry::{ModelProfile, ModelProfileRegistry};
pub use types::{CatalogModel, EnhancedScene, GenerationRequest, ProviderId};
