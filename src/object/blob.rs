use std::fmt;
use std::slice;

use crate::native::{raw, Owned};
use crate::oid::OId;
use crate::repository::Repository;

/// File contents, valid for as long as its repository is open.
pub struct Blob<'r> {
    raw: Owned<raw::git_blob>,
    repo: &'r Repository,
}

impl<'r> Blob<'r> {
    pub(crate) fn from_owned(raw: Owned<raw::git_blob>, repo: &'r Repository) -> Self {
        Self { raw, repo }
    }

    pub fn id(&self) -> OId {
        unsafe { OId::from_native(raw::git_blob_id(self.raw.as_ptr())) }.unwrap_or_else(OId::zero)
    }

    pub fn owner(&self) -> &'r Repository {
        self.repo
    }

    pub fn size(&self) -> usize {
        unsafe { raw::git_blob_rawsize(self.raw.as_ptr()) as usize }
    }

    /// raw bytes, borrowed from the engine's copy of the object
    pub fn content(&self) -> &[u8] {
        let size = self.size();
        if size == 0 {
            return &[];
        }

        unsafe {
            let data = raw::git_blob_rawcontent(self.raw.as_ptr()) as *const u8;
            if data.is_null() {
                return &[];
            }
            slice::from_raw_parts(data, size)
        }
    }

    /// the engine's binary heuristic (NUL bytes or too many non-printables)
    pub fn is_binary(&self) -> bool {
        unsafe { raw::git_blob_is_binary(self.raw.as_ptr()) == 1 }
    }
}

impl fmt::Debug for Blob<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("id", &self.id())
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::TestRepo;

    #[test]
    fn test_text_and_binary_blobs() {
        let fixture = TestRepo::new();
        let text = fixture.blob(b"plain text\n");
        let binary = fixture.blob(&[0u8, 159, 146, 150, 0, 1]);
        let empty = fixture.blob(b"");
        let repo = fixture.open();

        let blob = repo.lookup_blob(&text).unwrap();
        assert_eq!(blob.size(), 11);
        assert_eq!(blob.content(), b"plain text\n");
        assert!(!blob.is_binary());

        let blob = repo.lookup_blob(&binary).unwrap();
        assert_eq!(blob.size(), 6);
        assert!(blob.is_binary());

        let blob = repo.lookup_blob(&empty).unwrap();
        assert!(blob.content().is_empty());
    }
}
