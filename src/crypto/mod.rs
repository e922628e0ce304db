// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result, bail};
use hmac::{Hmac, Mac};
use p256::{
    PublicKey, SecretKey,
    ecdsa::{Signature, VerifyingKey, signature::Verifier},
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey},
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cfg::enums::KeyType;

type HmacSha256 = Hmac<Sha256>;

/// Long-lived key material of one provisioning session: the device
/// P-256 key pair and the device-type (cloud) public key that signs
/// every DSS response.
#[derive(Debug, Clone)]
pub struct DeviceKeys {
    private_key: SecretKey,
    public_key_der: Vec<u8>,
    cloud_public_key: PublicKey,
    cloud_public_key_der: Vec<u8>,
}

impl DeviceKeys {
    pub fn new(
        private_key: &[u8],
        private_key_type: KeyType,
        public_key: &[u8],
        public_key_type: KeyType,
        cloud_public_key: &[u8],
        cloud_public_key_type: KeyType,
    ) -> Result<Self> {
        let private_key = parse_private_key(private_key, private_key_type)
            .context("failed to parse device private key")?;
        let public = parse_public_key(public_key, public_key_type)
            .context("failed to parse device public key")?;
        let cloud = parse_public_key(cloud_public_key, cloud_public_key_type)
            .context("failed to parse device-type public key")?;

        if private_key.public_key() != public {
            bail!("device public key does not match the private key");
        }

        Ok(Self {
            private_key,
            public_key_der: encode_public_key_der(&public)?,
            cloud_public_key: cloud,
            cloud_public_key_der: encode_public_key_der(&cloud)?,
        })
    }

    /// Device public key, canonical SubjectPublicKeyInfo DER.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Device-type (cloud) public key, canonical DER.
    pub fn cloud_public_key_der(&self) -> &[u8] {
        &self.cloud_public_key_der
    }

    /// SHA-256 of the raw ECDH shared secret between the device private
    /// key and the device-type public key.
    pub fn ecdh_shared_secret(&self) -> [u8; 32] {
        let shared = p256::ecdh::diffie_hellman(
            self.private_key.to_nonzero_scalar(),
            self.cloud_public_key.as_affine(),
        );
        sha256(shared.raw_secret_bytes().as_slice())
    }

    /// Verify an ECDSA-P256-SHA256 DER signature over `payload` against
    /// the device-type public key.
    pub fn verify_cloud_signature(&self, payload: &[u8], signature_der: &[u8]) -> bool {
        let signature = match Signature::from_der(signature_der) {
            Ok(s) => s,
            Err(e) => {
                debug!("signature header is not valid DER: {e}");
                return false;
            },
        };
        VerifyingKey::from(&self.cloud_public_key)
            .verify(payload, &signature)
            .is_ok()
    }
}

fn parse_private_key(bytes: &[u8], key_type: KeyType) -> Result<SecretKey> {
    match key_type {
        KeyType::Pem => {
            let pem = std::str::from_utf8(bytes)
                .context("PEM private key is not valid UTF-8")?;
            SecretKey::from_pkcs8_pem(pem)
                .or_else(|_| SecretKey::from_sec1_pem(pem))
                .context("not a PKCS#8 or SEC1 P-256 private key")
        },
        KeyType::Der => SecretKey::from_pkcs8_der(bytes)
            .or_else(|_| SecretKey::from_sec1_der(bytes))
            .context("not a PKCS#8 or SEC1 P-256 private key"),
    }
}

fn parse_public_key(bytes: &[u8], key_type: KeyType) -> Result<PublicKey> {
    match key_type {
        KeyType::Pem => {
            let pem = std::str::from_utf8(bytes)
                .context("PEM public key is not valid UTF-8")?;
            PublicKey::from_public_key_pem(pem)
                .context("not a SubjectPublicKeyInfo P-256 public key")
        },
        KeyType::Der => PublicKey::from_public_key_der(bytes)
            .context("not a SubjectPublicKeyInfo P-256 public key"),
    }
}

fn encode_public_key_der(key: &PublicKey) -> Result<Vec<u8>> {
    Ok(key
        .to_public_key_der()
        .context("failed to encode public key as DER")?
        .as_bytes()
        .to_vec())
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

pub fn random_bytes(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
}
