//! Protocol constants shared by the key store, the hybrid engine and the decoder.

/// Smallest RSA modulus accepted for connection key pairs.
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// Modulus size used when no configuration overrides it.
pub const DEFAULT_RSA_KEY_BITS: usize = MIN_RSA_KEY_BITS;

/// Public exponent assumed when a peer key only carries a bare modulus.
pub const DEFAULT_PUBLIC_EXPONENT: u32 = 65_537;

/// AES-256 key length in bytes.
pub const AES_KEY_SIZE: usize = 32;

/// AES block / CBC IV length in bytes.
pub const AES_IV_SIZE: usize = 16;

/// AES-GCM nonce length in bytes.
pub const GCM_NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const GCM_TAG_SIZE: usize = 16;

/// Algorithm tag carried by (or implied for) every wire envelope.
pub const DEFAULT_ENVELOPE_ALGORITHM: &str = "AES-256-CBC";

/// Line width of Base64 bodies in PEM blocks.
pub const PEM_LINE_WIDTH: usize = 64;

/// Alias of the device-bound symmetric key protecting local secrets.
pub const LOCAL_SECRET_KEY_ALIAS: &str = "scakit:local-secret";
