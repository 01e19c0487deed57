use std::cell::OnceCell;
use std::fmt;

use super::{Object, ObjectKind};
use crate::error::{GgitError, GgitResult};
use crate::native::{self, raw, Owned};
use crate::oid::OId;
use crate::repository::Repository;
use crate::signature::{Signature, SignatureBox};

/// An annotated tag, valid for as long as its repository is open.
pub struct Tag<'r> {
    raw: Owned<raw::git_tag>,
    repo: &'r Repository,
    tagger: OnceCell<Option<SignatureBox>>,
}

impl<'r> Tag<'r> {
    pub(crate) fn from_owned(raw: Owned<raw::git_tag>, repo: &'r Repository) -> Self {
        Self {
            raw,
            repo,
            tagger: OnceCell::new(),
        }
    }

    pub fn id(&self) -> OId {
        unsafe { OId::from_native(raw::git_tag_id(self.raw.as_ptr())) }.unwrap_or_else(OId::zero)
    }

    pub fn owner(&self) -> &'r Repository {
        self.repo
    }

    pub fn name(&self) -> Option<&str> {
        unsafe { native::opt_str(raw::git_tag_name(self.raw.as_ptr())) }
    }

    pub fn message(&self) -> Option<&str> {
        unsafe { native::opt_str(raw::git_tag_message(self.raw.as_ptr())) }
    }

    /// `None` for tags written without a tagger line
    pub fn tagger(&self) -> Option<SignatureBox> {
        self.tagger
            .get_or_init(|| unsafe {
                Signature::from_native(raw::git_tag_tagger(self.raw.as_ptr())).map(SignatureBox::new)
            })
            .as_ref()
            .map(SignatureBox::add_ref)
    }

    pub fn target_id(&self) -> OId {
        unsafe { OId::from_native(raw::git_tag_target_id(self.raw.as_ptr())) }
            .unwrap_or_else(OId::zero)
    }

    pub fn target_kind(&self) -> GgitResult<ObjectKind> {
        ObjectKind::from_native(unsafe { raw::git_tag_target_type(self.raw.as_ptr()) })
    }

    /// load the tagged object
    pub fn target(&self) -> GgitResult<Object<'r>> {
        let object = unsafe { native::create(|out| raw::git_tag_target(out, self.raw.as_ptr())) }
            .map_err(|e| e.or_not_found(|| GgitError::ObjectNotFound(self.target_id().to_hex())))?;
        self.repo.wrap_object(object)
    }
}

impl fmt::Debug for Tag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("target", &self.target_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::object::ObjectKind;
    use crate::testutil::TestRepo;

    #[test]
    fn test_annotated_tag() {
        let fixture = TestRepo::new();
        let root = fixture.commit("root", &[], 1_000);
        let tag_id = fixture.tag("v1.0", root, "first release");
        let repo = fixture.open();

        let tag = repo.lookup_tag(&tag_id).unwrap();
        assert_eq!(tag.id(), tag_id);
        assert_eq!(tag.name(), Some("v1.0"));
        assert_eq!(tag.message().map(str::trim_end), Some("first release"));
        assert_eq!(tag.target_id(), root);
        assert_eq!(tag.target_kind().unwrap(), ObjectKind::Commit);
        assert_eq!(tag.tagger().unwrap().name(), TestRepo::AUTHOR);

        let target = tag.target().unwrap();
        assert_eq!(target.kind(), ObjectKind::Commit);
        assert_eq!(target.id(), root);
    }
}
