// [libs/infra/notify/src/protector.rs]
/*!
 * =================================================================
 * APARATO: CREDENTIAL PROTECTOR (V1.0)
 * CLASIFICACION: CORE SECURITY (ESTRATO L3)
 * RESPONSABILIDAD: PROTEGER/DESPROTEGER CONTRASENAS SMTP EN REPOSO
 *
 * Cifra y descifra contra material de llave propio residente en
 * `dataRoot`, derivando una subllave por proposito via
 * PBKDF2-HMAC-SHA256 antes de abrir el tunel AES-256-GCM.
 * =================================================================
 */

use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use tracing::{info, instrument, warn};

use crate::errors::NotifyError;

const KEY_MATERIAL_BYTES: usize = 32;
const DERIVED_KEY_BYTES: usize = 32;
const PBKDF2_ITERATIONS: u32 = 150_000;
const KEY_FILE_NAME: &str = "protector.key";

/// Constant purpose string for SMTP password protection.
pub const SMTP_PASSWORD_PURPOSE: &str = "ITWebsiteMonitor.SmtpPassword.v1";

pub struct Protector {
    key_material: [u8; KEY_MATERIAL_BYTES],
}

impl Protector {
    /// Loads key material from `{dataRoot}/protector.key`, generating it
    /// with a 600-permission file on first run.
    #[instrument]
    pub async fn open(data_root: &Path) -> Result<Self, NotifyError> {
        let key_path = key_file_path(data_root);

        if let Some(parent) = key_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| NotifyError::ProtectorFailure(format!("key directory: {error}")))?;
        }

        let key_material = match tokio::fs::read(&key_path).await {
            Ok(bytes) if bytes.len() == KEY_MATERIAL_BYTES => {
                let mut material = [0u8; KEY_MATERIAL_BYTES];
                material.copy_from_slice(&bytes);
                material
            }
            Ok(_) => {
                warn!(path = %key_path.display(), "protector key file has unexpected length, regenerating");
                generate_and_persist(&key_path).await?
            }
            Err(_) => {
                info!(path = %key_path.display(), "no protector key found, generating one");
                generate_and_persist(&key_path).await?
            }
        };

        Ok(Self { key_material })
    }

    #[cfg(test)]
    pub fn from_raw_material(key_material: [u8; KEY_MATERIAL_BYTES]) -> Self {
        Self { key_material }
    }

    /// Encrypts `plaintext`, scoped to `purpose`. Output is
    /// base64(nonce || ciphertext), safe to store as opaque text.
    pub fn protect(&self, purpose: &str, plaintext: &str) -> Result<String, NotifyError> {
        let cipher = Aes256Gcm::new(&self.derive_subkey(purpose));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, Payload { msg: plaintext.as_bytes(), aad: purpose.as_bytes() })
            .map_err(|_| NotifyError::ProtectorFailure("encryption failed".into()))?;

        let mut combined = Vec::with_capacity(nonce.len() + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(combined))
    }

    /// Reverses `protect`. A purpose mismatch or tampered ciphertext
    /// fails the AEAD integrity check and returns `ProtectorFailure`.
    pub fn unprotect(&self, purpose: &str, opaque: &str) -> Result<String, NotifyError> {
        let combined = BASE64
            .decode(opaque)
            .map_err(|error| NotifyError::ProtectorFailure(format!("base64 decode: {error}")))?;

        if combined.len() < 12 {
            return Err(NotifyError::ProtectorFailure("opaque value too short".into()));
        }
        let (nonce_bytes, ciphertext) = combined.split_at(12);

        let cipher = Aes256Gcm::new(&self.derive_subkey(purpose));
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = cipher
            .decrypt(nonce, Payload { msg: ciphertext, aad: purpose.as_bytes() })
            .map_err(|_| NotifyError::ProtectorFailure("decryption failed (wrong purpose or tampered value)".into()))?;

        String::from_utf8(plaintext).map_err(|error| NotifyError::ProtectorFailure(error.to_string()))
    }

    fn derive_subkey(&self, purpose: &str) -> Key<Aes256Gcm> {
        let mut derived = [0u8; DERIVED_KEY_BYTES];
        pbkdf2_hmac::<Sha256>(&self.key_material, purpose.as_bytes(), PBKDF2_ITERATIONS, &mut derived);
        *Key::<Aes256Gcm>::from_slice(&derived)
    }
}

fn key_file_path(data_root: &Path) -> PathBuf {
    data_root.join(KEY_FILE_NAME)
}

async fn generate_and_persist(key_path: &Path) -> Result<[u8; KEY_MATERIAL_BYTES], NotifyError> {
    let mut material = [0u8; KEY_MATERIAL_BYTES];
    rand::thread_rng().fill_bytes(&mut material);

    tokio::fs::write(key_path, material)
        .await
        .map_err(|error| NotifyError::ProtectorFailure(format!("key persist: {error}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(key_path, permissions)
            .await
            .map_err(|error| NotifyError::ProtectorFailure(format!("key permissions: {error}")))?;
    }

    Ok(material)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protector() -> Protector {
        Protector::from_raw_material([7u8; KEY_MATERIAL_BYTES])
    }

    #[test]
    fn protect_then_unprotect_recovers_plaintext() {
        let protector = protector();
        let opaque = protector.protect(SMTP_PASSWORD_PURPOSE, "hunter2").unwrap();
        let recovered = protector.unprotect(SMTP_PASSWORD_PURPOSE, &opaque).unwrap();
        assert_eq!(recovered, "hunter2");
    }

    #[test]
    fn wrong_purpose_fails_to_unprotect() {
        let protector = protector();
        let opaque = protector.protect(SMTP_PASSWORD_PURPOSE, "hunter2").unwrap();
        let result = protector.unprotect("SomeOtherPurpose.v1", &opaque);
        assert!(result.is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_integrity_check() {
        let protector = protector();
        let mut opaque = protector.protect(SMTP_PASSWORD_PURPOSE, "hunter2").unwrap();
        opaque.push('x');
        let result = protector.unprotect(SMTP_PASSWORD_PURPOSE, &opaque);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn open_generates_and_reuses_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = Protector::open(dir.path()).await.unwrap();
        let opaque = first.protect(SMTP_PASSWORD_PURPOSE, "reused-secret").unwrap();

        let second = Protector::open(dir.path()).await.unwrap();
        let recovered = second.unprotect(SMTP_PASSWORD_PURPOSE, &opaque).unwrap();
        assert_eq!(recovered, "reused-secret");
    }
}
