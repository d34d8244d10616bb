/// Data layer: array model, bundle import, language info and filtering.
///
/// Architecture:
/// ```text
///  metadata.json   results.json / archive ──(converter)──▶ JSON
///        │                  │
///        ▼                  ▼
///   ┌──────────────────────────┐
///   │  loader                  │  decode sentinels, reshape → LabeledArray
///   └──────────────────────────┘
///        │
///        ▼
///   ┌──────────────────────────┐
///   │ Dataset                  │  LabelUniverse + metrics + LanguageTable
///   └──────────────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  language attributes → auto-selected languages
///   └──────────┘
/// ```

pub mod archive;
pub mod filter;
pub mod float;
pub mod language;
pub mod loader;
pub mod model;
