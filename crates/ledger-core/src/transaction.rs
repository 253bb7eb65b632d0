use crate::constants::{SYSTEM_ADDRESS, SYSTEM_SIGNATURE};
use crate::error::{LedgerError, Result};
use crate::wallet::Signer;
use crate::{sha256, unix_millis, Hash, ZERO_HASH};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A value transfer between two addresses.
///
/// `hash` is computed once at construction over every field except
/// `signature` and `hash` itself. Editing the payload afterwards is
/// tampering and makes [`Transaction::validate`] fail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: u64,
    pub fee: u64,
    pub timestamp: u64,
    #[serde(with = "crate::hex_hash")]
    pub transaction_id: Hash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(with = "crate::hex_hash")]
    pub hash: Hash,
}

impl Transaction {
    /// Create an unsigned transfer stamped with the current time.
    pub fn create(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
        fee: u64,
    ) -> Result<Self> {
        Self::from_parts(sender, receiver, amount, fee, unix_millis(), rand::random())
    }

    /// Create an unsigned transfer with an explicit timestamp and id salt.
    pub fn from_parts(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
        fee: u64,
        timestamp: u64,
        salt: u64,
    ) -> Result<Self> {
        let sender = sender.into();
        let receiver = receiver.into();
        if sender.is_empty() {
            return Err(LedgerError::invalid_tx("sender address is empty"));
        }
        check_payload(&receiver, amount)?;
        Ok(Self::build(sender, receiver, amount, fee, timestamp, salt, None))
    }

    /// Reward transaction minted by the ledger for a miner.
    pub fn coinbase(receiver: impl Into<String>, amount: u64) -> Result<Self> {
        let receiver = receiver.into();
        check_payload(&receiver, amount)?;
        Ok(Self::build(
            SYSTEM_ADDRESS.to_string(),
            receiver,
            amount,
            0,
            unix_millis(),
            rand::random(),
            Some(SYSTEM_SIGNATURE.to_string()),
        ))
    }

    fn build(
        sender: String,
        receiver: String,
        amount: u64,
        fee: u64,
        timestamp: u64,
        salt: u64,
        signature: Option<String>,
    ) -> Self {
        let transaction_id = derive_transaction_id(&sender, &receiver, amount, timestamp, salt);
        let mut tx = Self {
            sender,
            receiver,
            amount,
            fee,
            timestamp,
            transaction_id,
            signature,
            hash: ZERO_HASH,
        };
        tx.hash = tx.compute_hash();
        tx
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == SYSTEM_ADDRESS
    }

    /// Sorted-key encoding shared by the transaction hash and the block hash.
    pub fn canonical(&self) -> Value {
        // keys in lexicographic order so the text is identical with or without
        // serde_json's `preserve_order`
        json!({
            "amount": self.amount,
            "fee": self.fee,
            "receiver": self.receiver,
            "sender": self.sender,
            "timestamp": self.timestamp,
            "transaction_id": hex::encode(self.transaction_id),
        })
    }

    pub fn compute_hash(&self) -> Hash {
        sha256(self.canonical().to_string())
    }

    /// Attach a signature over the transaction hash.
    ///
    /// System transactions receive the fixed system marker; every other
    /// transaction must be signed by the wallet that owns `sender`.
    pub fn sign<S: Signer + ?Sized>(&mut self, signer: &S) -> Result<()> {
        if self.is_coinbase() {
            self.signature = Some(SYSTEM_SIGNATURE.to_string());
            return Ok(());
        }
        if signer.address() != self.sender {
            return Err(LedgerError::SignerMismatch {
                expected: self.sender.clone(),
                actual: signer.address().to_string(),
            });
        }
        self.signature = Some(signer.sign(&self.hash));
        Ok(())
    }

    /// Checks the signature against the signer that owns `sender`.
    ///
    /// System transactions only need the fixed marker.
    pub fn verify_signature<S: Signer + ?Sized>(&self, signer: &S) -> bool {
        match self.signature.as_deref() {
            Some(SYSTEM_SIGNATURE) if self.is_coinbase() => true,
            Some(signature) if !self.is_coinbase() => {
                signer.address() == self.sender && signer.verify(&self.hash, signature)
            }
            _ => false,
        }
    }

    /// Side-effect free integrity check.
    ///
    /// The signature is opaque here and only its presence is checked.
    /// Callers holding the sender's [`Signer`] use
    /// [`Transaction::verify_signature`].
    pub fn validate(&self) -> Result<()> {
        if self.sender.is_empty() {
            return Err(LedgerError::invalid_tx("sender address is empty"));
        }
        check_payload(&self.receiver, self.amount)?;
        match (self.is_coinbase(), self.signature.as_deref()) {
            (true, None) | (true, Some(SYSTEM_SIGNATURE)) => {}
            (true, Some(_)) => {
                return Err(LedgerError::invalid_tx("system transaction carries a foreign signature"))
            }
            (false, None) => return Err(LedgerError::invalid_tx("transaction is not signed")),
            (false, Some(sig)) if sig.is_empty() => {
                return Err(LedgerError::invalid_tx("transaction is not signed"))
            }
            (false, Some(_)) => {}
        }
        if self.hash != self.compute_hash() {
            return Err(LedgerError::invalid_tx(format!(
                "hash mismatch for transaction {}",
                self.id_hex()
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn id_hex(&self) -> String {
        hex::encode(self.transaction_id)
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

fn check_payload(receiver: &str, amount: u64) -> Result<()> {
    if receiver.is_empty() {
        return Err(LedgerError::invalid_tx("receiver address is empty"));
    }
    if amount == 0 {
        return Err(LedgerError::invalid_tx("amount must be positive"));
    }
    Ok(())
}

pub fn derive_transaction_id(
    sender: &str,
    receiver: &str,
    amount: u64,
    timestamp: u64,
    salt: u64,
) -> Hash {
    let preimage = json!({
        "amount": amount,
        "receiver": receiver,
        "salt": salt,
        "sender": sender,
        "timestamp": timestamp,
    });
    sha256(preimage.to_string())
}
