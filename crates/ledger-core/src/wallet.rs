//! Address and signing collaborators.
//!
//! [`Wallet`] is a placeholder signer: its "signature" is a digest of the
//! secret and the transaction hash. It satisfies the [`Signer`] contract the
//! ledger depends on but offers no asymmetric security.
use crate::error::Result;
use crate::{sha256, Balance, Hash, Ledger, Transaction};
use rand::Rng;
use std::fmt;

/// Identity that can authorise transactions sent from its address.
pub trait Signer {
    fn address(&self) -> &str;
    fn sign(&self, message: &Hash) -> String;
    /// True if `signature` is this signer's signature over `message`.
    fn verify(&self, message: &Hash, signature: &str) -> bool;
}

#[derive(Clone)]
pub struct Wallet {
    secret: [u8; 32],
    public_key: Hash,
    address: String,
}

impl Wallet {
    pub fn generate() -> Self {
        Self::from_rng(&mut rand::thread_rng())
    }

    pub fn from_rng<R: Rng>(rng: &mut R) -> Self {
        let mut secret = [0u8; 32];
        rng.fill(&mut secret);
        Self::from_secret(secret)
    }

    pub fn from_secret(secret: [u8; 32]) -> Self {
        let public_key = sha256(secret);
        let address = hex::encode(&sha256(public_key)[..20]);
        Self {
            secret,
            public_key,
            address,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    /// Replayed balance of this wallet's address.
    pub fn balance(&self, ledger: &Ledger) -> Balance {
        ledger.balance_of(&self.address)
    }

    /// Build and sign a transfer from this wallet.
    pub fn transfer(&self, receiver: &str, amount: u64, fee: u64) -> Result<Transaction> {
        let mut tx = Transaction::create(self.address.clone(), receiver, amount, fee)?;
        tx.sign(self)?;
        Ok(tx)
    }

    /// Sign a transfer and submit it to the ledger's pending pool.
    /// Returns the transaction id.
    pub fn send(&self, receiver: &str, amount: u64, fee: u64, ledger: &mut Ledger) -> Result<Hash> {
        let tx = self.transfer(receiver, amount, fee)?;
        let id = tx.transaction_id;
        ledger.create_transaction(tx)?;
        Ok(id)
    }
}

impl Signer for Wallet {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign(&self, message: &Hash) -> String {
        let mut preimage = Vec::with_capacity(64);
        preimage.extend_from_slice(&self.secret);
        preimage.extend_from_slice(message);
        hex::encode(sha256(preimage))
    }

    fn verify(&self, message: &Hash, signature: &str) -> bool {
        Signer::sign(self, message) == signature
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn address_is_stable_for_a_secret() {
        let a = Wallet::from_secret([1u8; 32]);
        let b = Wallet::from_secret([1u8; 32]);
        assert_eq!(a.address(), b.address());
        assert_eq!(a.address().len(), 40);
    }

    #[test]
    fn seeded_wallets_differ() {
        let mut rng = StdRng::seed_from_u64(42);
        let a = Wallet::from_rng(&mut rng);
        let b = Wallet::from_rng(&mut rng);
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn signature_depends_on_message() {
        let wallet = Wallet::from_secret([5u8; 32]);
        let s1 = Signer::sign(&wallet, &[0u8; 32]);
        let s2 = Signer::sign(&wallet, &[1u8; 32]);
        assert_ne!(s1, s2);
        assert_eq!(s1, Signer::sign(&wallet, &[0u8; 32]));
    }

    #[test]
    fn verify_accepts_only_own_signatures() {
        let wallet = Wallet::from_secret([5u8; 32]);
        let other = Wallet::from_secret([6u8; 32]);
        let message = [3u8; 32];
        let signature = Signer::sign(&wallet, &message);
        assert!(wallet.verify(&message, &signature));
        assert!(!wallet.verify(&[4u8; 32], &signature));
        assert!(!other.verify(&message, &signature));
        assert!(!wallet.verify(&message, "x"));
    }

    #[test]
    fn debug_hides_secret() {
        let wallet = Wallet::from_secret([7u8; 32]);
        let printed = format!("{wallet:?}");
        assert!(!printed.contains(&hex::encode([7u8; 32])));
        assert!(printed.contains(wallet.address()));
    }

    #[test]
    fn transfer_is_signed() {
        let wallet = Wallet::generate();
        let tx = wallet.transfer("receiver", 3, 1).unwrap();
        assert_eq!(tx.sender, wallet.address());
        tx.validate().unwrap();
    }
}
