use crate::error::{EngineError, InvalidInput};
use serde::{Serialize, Deserialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Sha3_256,
    Blake3,
}

impl Algorithm {
    pub fn all() -> Vec<Algorithm> {
        vec![
            Algorithm::Md5,
            Algorithm::Sha1,
            Algorithm::Sha256,
            Algorithm::Sha384,
            Algorithm::Sha512,
            Algorithm::Sha3_256,
            Algorithm::Blake3,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha1 => "SHA-1",
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha384 => "SHA-384",
            Algorithm::Sha512 => "SHA-512",
            Algorithm::Sha3_256 => "SHA3-256",
            Algorithm::Blake3 => "BLAKE3",
        }
    }

    /// Length of the rendered hex digest.
    pub fn digest_len(&self) -> usize {
        match self {
            Algorithm::Md5 => 32,
            Algorithm::Sha1 => 40,
            Algorithm::Sha256 | Algorithm::Sha3_256 | Algorithm::Blake3 => 64,
            Algorithm::Sha384 => 96,
            Algorithm::Sha512 => 128,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FromStr for Algorithm {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = squash(s);
        Algorithm::all()
            .into_iter()
            .find(|a| squash(a.name()) == wanted)
            .ok_or_else(|| InvalidInput::UnknownAlgorithm(s.to_string()))
    }
}

impl TryFrom<String> for Algorithm {
    type Error = InvalidInput;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        value.name().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Idle,
    Running,
    Cancelled,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Cancelled | JobState::Completed | JobState::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub percent: u8,
    pub bytes_read: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEvent {
    pub algorithm: Algorithm,
    pub digest: String,
    pub bytes_hashed: u64,
}

/// Everything a job reports back to its handle, in order.
/// `Completed`, `Failed` and `Cancelled` are terminal and always last.
#[derive(Debug)]
pub enum JobEvent {
    Progress(ProgressEvent),
    Completed(ResultEvent),
    Failed(EngineError),
    Cancelled,
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress(_))
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Completed(ResultEvent),
    Cancelled,
    Failed(EngineError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Match,
    Mismatch,
    Unchecked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: String,
    pub file_name: String,
    pub file_path: PathBuf,
    pub algorithm: Algorithm,
    pub computed_hash: String,
    pub reference_hash: Option<String>,
    pub status: VerificationStatus,
    pub bytes_hashed: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl VerificationRecord {
    pub fn new(id: JobId, path: PathBuf, result: ResultEvent, reference_hash: Option<String>) -> Self {
        let status = match &reference_hash {
            Some(rh) if crate::utils::digests_match(&result.digest, rh) => VerificationStatus::Match,
            Some(_) => VerificationStatus::Mismatch,
            None => VerificationStatus::Unchecked,
        };
        VerificationRecord {
            id: id.to_string(),
            file_name: path.file_name().and_then(|s| s.to_str()).unwrap_or("file").to_string(),
            file_path: path,
            algorithm: result.algorithm,
            computed_hash: result.digest,
            reference_hash,
            status,
            bytes_hashed: result.bytes_hashed,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_algorithm_spellings() {
        assert_eq!("SHA-256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
        assert_eq!("sha256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
        assert_eq!("Sha_512".parse::<Algorithm>().unwrap(), Algorithm::Sha512);
        assert_eq!("sha3-256".parse::<Algorithm>().unwrap(), Algorithm::Sha3_256);
        assert_eq!("md5".parse::<Algorithm>().unwrap(), Algorithm::Md5);
        assert_eq!("BLAKE3".parse::<Algorithm>().unwrap(), Algorithm::Blake3);
        assert_eq!("sha1".parse::<Algorithm>().unwrap(), Algorithm::Sha1);
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let err = "whirlpool".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, InvalidInput::UnknownAlgorithm(ref n) if n == "whirlpool"));
        assert!("".parse::<Algorithm>().is_err());
    }

    #[test]
    fn algorithm_serializes_as_name() {
        let json = serde_json::to_string(&Algorithm::Sha3_256).unwrap();
        assert_eq!(json, "\"SHA3-256\"");
        let back: Algorithm = serde_json::from_str("\"sha-1\"").unwrap();
        assert_eq!(back, Algorithm::Sha1);
    }

    #[test]
    fn record_status_follows_reference() {
        let result = ResultEvent {
            algorithm: Algorithm::Md5,
            digest: "900150983cd24fb0d6963f7d28e17f72".to_string(),
            bytes_hashed: 3,
        };
        let path = PathBuf::from("/tmp/abc.txt");
        let rec = VerificationRecord::new(
            JobId::new(),
            path.clone(),
            result.clone(),
            Some("900150983CD24FB0D6963F7D28E17F72".to_string()),
        );
        assert_eq!(rec.status, VerificationStatus::Match);
        assert_eq!(rec.file_name, "abc.txt");

        let rec = VerificationRecord::new(JobId::new(), path.clone(), result.clone(), Some("00".to_string()));
        assert_eq!(rec.status, VerificationStatus::Mismatch);

        let rec = VerificationRecord::new(JobId::new(), path, result, None);
        assert_eq!(rec.status, VerificationStatus::Unchecked);
    }
}
