//! Throwaway repositories for tests.
//!
//! Fixtures are built with `git2` so the code under test never writes its
//! own inputs.

use std::sync::Once;

use git2::{Oid, Signature, Time};
use tempfile::TempDir;

use crate::oid::OId;
use crate::repository::Repository;

/// install a test-writer subscriber once per process
pub(crate) fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
    });
}

pub(crate) struct TestRepo {
    pub dir: TempDir,
    pub git: git2::Repository,
}

impl TestRepo {
    pub const AUTHOR: &'static str = "Test Author";
    pub const EMAIL: &'static str = "author@example.com";

    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let git = git2::Repository::init(dir.path()).unwrap();
        Self { dir, git }
    }

    /// open the fixture through the code under test
    pub fn open(&self) -> Repository {
        Repository::open(self.dir.path()).unwrap()
    }

    fn signature(time: i64) -> Signature<'static> {
        Signature::new(Self::AUTHOR, Self::EMAIL, &Time::new(time, 0)).unwrap()
    }

    pub fn blob(&self, content: &[u8]) -> OId {
        self.git.blob(content).unwrap().into()
    }

    pub fn write_file(&self, path: &str, content: &[u8]) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    /// build a (possibly nested) tree from `files`
    fn tree(&self, files: &[(&str, &[u8])]) -> Oid {
        let mut index = git2::Index::new().unwrap();
        for (path, content) in files {
            let id = self.git.blob(content).unwrap();
            let entry = git2::IndexEntry {
                ctime: git2::IndexTime::new(0, 0),
                mtime: git2::IndexTime::new(0, 0),
                dev: 0,
                ino: 0,
                mode: 0o100644,
                uid: 0,
                gid: 0,
                file_size: content.len() as u32,
                id,
                flags: 0,
                flags_extended: 0,
                path: path.as_bytes().to_vec(),
            };
            index.add(&entry).unwrap();
        }
        index.write_tree_to(&self.git).unwrap()
    }

    /// commit `files` on top of `parents` at `time`; no ref is moved
    pub fn commit_files(&self, message: &str, files: &[(&str, &[u8])], parents: &[OId], time: i64) -> OId {
        let tree = self.git.find_tree(self.tree(files)).unwrap();
        let parents: Vec<git2::Commit<'_>> = parents
            .iter()
            .map(|p| self.git.find_commit((*p).into()).unwrap())
            .collect();
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        let sig = Self::signature(time);
        self.git
            .commit(None, &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
            .into()
    }

    /// commit with an empty tree
    pub fn commit(&self, message: &str, parents: &[OId], time: i64) -> OId {
        self.commit_files(message, &[], parents, time)
    }

    /// a root-first chain of `n` commits, one second apart
    pub fn linear(&self, n: usize) -> Vec<OId> {
        let mut chain: Vec<OId> = Vec::with_capacity(n);
        for i in 0..n {
            let parents: Vec<OId> = chain.last().copied().into_iter().collect();
            let id = self.commit(&format!("commit {i}"), &parents, 1_000 + i as i64);
            chain.push(id);
        }
        chain
    }

    pub fn missing_parent() -> OId {
        OId::from_hex("dead000000000000000000000000000000000000").unwrap()
    }

    /// a commit whose parent is not in the object store
    pub fn commit_with_missing_parent(&self) -> OId {
        let tree = self.tree(&[]);
        let raw = format!(
            "tree {tree}\nparent {parent}\nauthor {name} <{email}> 1000 +0000\ncommitter {name} <{email}> 1000 +0000\n\ndangling\n",
            parent = Self::missing_parent(),
            name = Self::AUTHOR,
            email = Self::EMAIL,
        );
        let odb = self.git.odb().unwrap();
        odb.write(git2::ObjectType::Commit, raw.as_bytes()).unwrap().into()
    }

    /// an annotated tag pointing at `target`
    pub fn tag(&self, name: &str, target: OId, message: &str) -> OId {
        let object = self.git.find_object(target.into(), None).unwrap();
        let sig = Self::signature(2_000);
        self.git.tag(name, &object, &sig, message, false).unwrap().into()
    }

    pub fn set_ref(&self, name: &str, target: OId) {
        self.git.reference(name, target.into(), true, "test fixture").unwrap();
    }

    pub fn set_head(&self, name: &str) {
        self.git.set_head(name).unwrap();
    }
}
