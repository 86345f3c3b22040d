//! Cryptographic building blocks.

mod asymmetric;
pub mod encoding;
mod hybrid;
mod local_secret;
mod signature;
mod symmetric;

pub use asymmetric::{unwrap_secret, wrap_secret, RsaKeyPair};
pub use hybrid::{DecryptionFailed, EnvelopeCipher, HybridCryptoEngine, SealedParts};
pub use local_secret::{LocalSecretBlob, LocalSecretNonce, LocalSecretProtector};
pub use signature::{sign_request, verify_request_signature, SignedRequest};
pub use symmetric::{aes_cbc_decrypt, aes_cbc_encrypt, random_key_and_iv, SymmetricKey};
