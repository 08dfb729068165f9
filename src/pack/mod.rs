//! Language pack loading and layer merging.
//!
//! A pack directory holds `phonemes.yaml` plus `lang/<tag>.yaml` layers.
//! Loading merges `default` → `lang` → `lang-region` → `lang-region-variant`
//! (later layers override by key), then freezes the result into an immutable
//! [`PackSet`] shared read-only by every call. Nothing mutates a pack after
//! publication; a language switch builds a fresh one.

pub mod lang;
pub mod phoneme;
pub mod schema;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::pack::lang::LanguagePack;
use crate::pack::phoneme::PhonemeDef;
use crate::pack::schema::{LangDoc, PhonemeDoc, RawNormalization, RawSettings};

/// A merged, immutable pack: the phoneme table plus the language pack.
#[derive(Debug)]
pub struct PackSet {
    pub lang_tag: String,
    phonemes: HashMap<String, Arc<PhonemeDef>>,
    pub lang: LanguagePack,
}

impl PackSet {
    /// Loads and merges the pack layers for `lang_tag` from `dir`.
    pub fn load(dir: &Path, lang_tag: &str) -> Result<Arc<PackSet>> {
        let tag = normalize_lang_tag(lang_tag);

        let phonemes_path = dir.join("phonemes.yaml");
        if !phonemes_path.is_file() {
            return Err(Error::PackNotFound(dir.to_path_buf()));
        }
        let phoneme_doc: PhonemeDoc = parse_yaml_file(&phonemes_path)?;
        let mut raw_phonemes = phoneme_doc.phonemes;

        let mut settings = RawSettings::default();
        let mut normalization = RawNormalization::default();
        let mut intonation = BTreeMap::new();
        let mut tones = BTreeMap::new();
        let mut aliases = BTreeMap::new();

        let mut matched_specific_layer = false;
        for layer_tag in lang_tag_chain(&tag) {
            let path = dir.join("lang").join(format!("{layer_tag}.yaml"));
            if !path.is_file() {
                continue;
            }
            if layer_tag != "default" {
                matched_specific_layer = true;
            }
            let doc: LangDoc = parse_yaml_file(&path)?;
            settings = settings.merged_with(&doc.settings);
            for (name, syms) in doc.normalization.classes {
                normalization.classes.insert(name, syms);
            }
            normalization
                .replacements
                .extend(doc.normalization.replacements);
            for (k, v) in doc.intonation {
                intonation.insert(k, v);
            }
            for (k, v) in doc.tones {
                tones.insert(k, v);
            }
            for (k, v) in doc.aliases {
                aliases.insert(k, v);
            }
            for (key, over) in doc.phonemes {
                let merged = match raw_phonemes.get(&key) {
                    Some(base) => base.merged_with(&over),
                    None => over,
                };
                raw_phonemes.insert(key, merged);
            }
        }

        if tag != "default" && !matched_specific_layer {
            return Err(Error::UnknownLanguage(tag));
        }

        let mut phonemes = HashMap::with_capacity(raw_phonemes.len());
        for (key, raw) in &raw_phonemes {
            let def = PhonemeDef::from_raw(key, raw);
            for unknown in &def.unknown_fields {
                warn!(phoneme = %key, field = %unknown, "ignoring unknown phoneme field");
            }
            phonemes.insert(key.clone(), Arc::new(def));
        }

        let lang = LanguagePack::from_merged(&settings, &normalization, &intonation, &tones, &aliases);
        info!(tag = %tag, phonemes = phonemes.len(), "loaded language pack");

        Ok(Arc::new(PackSet {
            lang_tag: tag,
            phonemes,
            lang,
        }))
    }

    /// Looks up a phoneme by key, following one level of alias indirection.
    pub fn phoneme(&self, key: &str) -> Option<&Arc<PhonemeDef>> {
        if let Some(def) = self.phonemes.get(key) {
            return Some(def);
        }
        self.lang
            .aliases
            .get(key)
            .and_then(|target| self.phonemes.get(target))
    }

    pub fn phoneme_count(&self) -> usize {
        self.phonemes.len()
    }
}

fn parse_yaml_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| Error::PackParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str(&text).map_err(|e| Error::PackParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Lowercases and hyphenates a language tag; empty input means `default`.
pub fn normalize_lang_tag(tag: &str) -> String {
    let tag = tag.trim();
    if tag.is_empty() {
        return "default".to_owned();
    }
    tag.replace('_', "-").to_ascii_lowercase()
}

/// The merge chain for a tag: `en-us-nyc` → default, en, en-us, en-us-nyc.
fn lang_tag_chain(tag: &str) -> Vec<String> {
    let mut chain = vec!["default".to_owned()];
    if tag == "default" {
        return chain;
    }
    let parts: Vec<&str> = tag.split('-').collect();
    for i in 1..=parts.len() {
        chain.push(parts[..i].join("-"));
    }
    chain
}

/// Path of the shipped reference pack, for demos and tests.
pub fn bundled_pack_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("packs")
}
