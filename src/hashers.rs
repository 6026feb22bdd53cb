use crate::models::Algorithm;
use sha2::Digest;

/// Running hash state for one job. Owned by the worker; fed one chunk at a time.
pub enum StreamHasher {
    Md5(md5::Context),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
    Sha3_256(sha3::Sha3_256),
    Blake3(Box<blake3::Hasher>),
}

impl StreamHasher {
    pub fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Md5 => StreamHasher::Md5(md5::Context::new()),
            Algorithm::Sha1 => StreamHasher::Sha1(sha1::Sha1::new()),
            Algorithm::Sha256 => StreamHasher::Sha256(sha2::Sha256::new()),
            Algorithm::Sha384 => StreamHasher::Sha384(sha2::Sha384::new()),
            Algorithm::Sha512 => StreamHasher::Sha512(sha2::Sha512::new()),
            Algorithm::Sha3_256 => StreamHasher::Sha3_256(sha3::Sha3_256::new()),
            Algorithm::Blake3 => StreamHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        match self {
            StreamHasher::Md5(ctx) => ctx.consume(chunk),
            StreamHasher::Sha1(h) => h.update(chunk),
            StreamHasher::Sha256(h) => h.update(chunk),
            StreamHasher::Sha384(h) => h.update(chunk),
            StreamHasher::Sha512(h) => h.update(chunk),
            StreamHasher::Sha3_256(h) => h.update(chunk),
            StreamHasher::Blake3(h) => {
                h.update(chunk);
            }
        }
    }

    /// Consumes the state and renders the digest as lowercase hex.
    pub fn finalize_hex(self) -> String {
        match self {
            StreamHasher::Md5(ctx) => format!("{:x}", ctx.finalize()),
            StreamHasher::Sha1(h) => hex::encode(h.finalize()),
            StreamHasher::Sha256(h) => hex::encode(h.finalize()),
            StreamHasher::Sha384(h) => hex::encode(h.finalize()),
            StreamHasher::Sha512(h) => hex::encode(h.finalize()),
            StreamHasher::Sha3_256(h) => hex::encode(h.finalize()),
            StreamHasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(algorithm: Algorithm, chunks: &[&[u8]]) -> String {
        let mut h = StreamHasher::new(algorithm);
        for c in chunks {
            h.update(c);
        }
        h.finalize_hex()
    }

    #[test]
    fn known_answers_for_abc() {
        let cases = [
            (Algorithm::Md5, "900150983cd24fb0d6963f7d28e17f72"),
            (Algorithm::Sha1, "a9993e364706816aba3e25717850c26c9cd0d89d"),
            (Algorithm::Sha256, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"),
            (
                Algorithm::Sha384,
                "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed8086072ba1e7cc2358baeca134c825a7",
            ),
            (
                Algorithm::Sha512,
                "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f",
            ),
            (Algorithm::Sha3_256, "3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532"),
            (Algorithm::Blake3, "6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85"),
        ];
        for (algo, expected) in cases {
            let got = digest_of(algo, &[b"abc"]);
            assert_eq!(got, expected, "{algo}");
            assert_eq!(got.len(), algo.digest_len(), "{algo}");
        }
    }

    #[test]
    fn empty_input_digests() {
        assert_eq!(digest_of(Algorithm::Md5, &[]), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(digest_of(Algorithm::Sha1, &[]), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            digest_of(Algorithm::Sha256, &[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn chunking_does_not_change_digest() {
        for algo in Algorithm::all() {
            let whole = digest_of(algo, &[b"hello world"]);
            let split = digest_of(algo, &[b"hel", b"", b"lo wor", b"ld"]);
            assert_eq!(whole, split, "{algo}");
        }
    }
}
