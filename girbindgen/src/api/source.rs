use std::{collections::HashMap, fs, path::Path};

use roxygen::roxygen;
use serde::{Deserialize, Serialize};

use crate::{
    api::context::NamespaceContext, api::target::Target, gir::registered::RegisteredType,
    utils::jsonl::read_model_file,
};

/// File extension for model data files
const JSONL_EXTENSION: &str = ".jsonl";

/// One line of a model file: a registered type and the namespace it
/// belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub namespace: String,
    #[serde(rename = "type")]
    pub ty: RegisteredType,
}

/// A directory of namespace model files, loaded and deduplicated.
///
/// Model files are JSON-lines, one [`ModelRecord`] per line, named
/// `<anything>.jsonl`. Records with the same namespace and type name
/// override earlier ones; files are read in path order so overrides are
/// deterministic.
pub struct Source {
    types: HashMap<(String, String), RegisteredType>,
}

impl Source {
    #[roxygen]
    pub fn new<P: AsRef<Path>>(
        /// Path to the directory containing namespace model files
        input_dir: P,
    ) -> Self {
        let input_dir = input_dir.as_ref().to_path_buf();
        if !input_dir.is_dir() {
            panic!(
                "Input directory {} does not exist or is not a directory",
                input_dir.display()
            );
        }

        let mut files = Vec::new();
        if let Ok(entries) = fs::read_dir(&input_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                    if file_name.ends_with(JSONL_EXTENSION) {
                        files.push(path);
                    }
                }
            }
        }
        files.sort();

        let mut types = HashMap::new();
        for path in files {
            #[cfg(feature = "debug")]
            println!("Reading model file: {}", path.display());
            match read_model_file(&path) {
                Ok(records) => {
                    for record in records {
                        // Deduplicate by namespace and type name
                        types.insert(
                            (record.namespace, record.ty.name().to_owned()),
                            record.ty,
                        );
                    }
                }
                Err(e) => {
                    panic!("Failed to read {}: {}", path.display(), e);
                }
            }
        }

        Self { types }
    }

    /// Namespaces seen across all model files, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().map(|(ns, _)| ns.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn types_all(&self) -> impl Iterator<Item = (&str, &RegisteredType)> {
        self.types.iter().map(|((ns, _), ty)| (ns.as_str(), ty))
    }

    pub fn types_in<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a RegisteredType> {
        self.types
            .iter()
            .filter(move |((ns, _), _)| ns == namespace)
            .map(|(_, ty)| ty)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Consume the loaded records into a [`NamespaceContext`] for the
    /// given target.
    pub fn into_context(self, target: Target) -> NamespaceContext {
        let mut builder = NamespaceContext::builder().target(target);
        for ((namespace, _), ty) in self.types {
            builder = builder.register(namespace, ty);
        }
        builder.build()
    }
}
