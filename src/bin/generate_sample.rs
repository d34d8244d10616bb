use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value as JsonValue};

use tokviz::data::float::encode_number;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// (label, continent, family, morphology, tier, speakers)
const LANGUAGES: [(&str, &str, &str, &str, u8, f64); 6] = [
    ("eng_Latn_stan1293", "Europe", "Indo-European", "fusional", 5, 1.5e9),
    ("deu_Latn_stan1295", "Europe", "Indo-European", "fusional", 5, 1.3e8),
    ("fin_Latn_finn1318", "Europe", "Uralic", "agglutinative", 4, 5.8e6),
    ("swh_Latn_swah1253", "Africa", "Niger-Congo", "agglutinative", 2, 1.6e7),
    ("tur_Latn_nucl1301", "Asia", "Turkic", "agglutinative", 4, 8.8e7),
    ("cmn_Hani_beij1234", "Asia", "Sino-Tibetan", "isolating", 5, 1.1e9),
];

/// (name, vocabulary size, base fertility)
const TOKENIZERS: [(&str, f64, f64); 4] = [
    ("bpe-32k", 32000.0, 1.9),
    ("bpe-64k", 64000.0, 1.6),
    ("unigram-50k", 50000.0, 1.7),
    ("byte-level", 256.0, 4.2),
];

/// Per-language difficulty factor driving the synthetic metrics.
fn difficulty(tier: u8) -> f64 {
    1.0 + (5 - tier.min(5)) as f64 * 0.15
}

fn encode_all(values: &[f64]) -> JsonValue {
    JsonValue::Array(values.iter().copied().map(encode_number).collect())
}

/// Nested rows of `width` cells each.
fn encode_rows(values: &[f64], width: usize) -> JsonValue {
    JsonValue::Array(values.chunks(width).map(encode_all).collect())
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let n_lang = LANGUAGES.len();

    // 1D: vocabulary size per tokenizer
    let vocab: Vec<f64> = TOKENIZERS.iter().map(|t| t.1).collect();

    // 2D: fertility and compression per tokenizer × language
    let mut fertility = Vec::with_capacity(TOKENIZERS.len() * n_lang);
    let mut compression = Vec::with_capacity(TOKENIZERS.len() * n_lang);
    for (ti, &(_, _, base)) in TOKENIZERS.iter().enumerate() {
        for (li, lang) in LANGUAGES.iter().enumerate() {
            let f = base * difficulty(lang.4) + rng.gauss(0.0, 0.05);
            fertility.push(f);
            // one hole so consumers see a NaN cell
            if ti == 3 && li == 5 {
                compression.push(f64::NAN);
            } else {
                compression.push(4.5 / f + rng.gauss(0.0, 0.02));
            }
        }
    }

    // 3D: tokenization parity per tokenizer × language × language
    let mut parity = Vec::with_capacity(TOKENIZERS.len() * n_lang * n_lang);
    for ti in 0..TOKENIZERS.len() {
        for a in 0..n_lang {
            for b in 0..n_lang {
                let fa = fertility[ti * n_lang + a];
                let fb = fertility[ti * n_lang + b];
                parity.push(if a == b { 1.0 } else { fa / fb });
            }
        }
    }

    let languages: Vec<&str> = LANGUAGES.iter().map(|l| l.0).collect();
    let mut info = Map::new();
    for &(label, continent, family, morphology, tier, speakers) in &LANGUAGES {
        let key = label.split('_').next().unwrap_or(label);
        let glottocode = label.rsplit('_').next().unwrap_or(label);
        info.insert(
            key.to_string(),
            json!({
                "continent": continent,
                "families": [family],
                "morphology": [morphology],
                "tier": tier,
                "speakers": speakers,
                "glottocodes": [glottocode],
            }),
        );
    }

    let metadata = json!({
        "dataset_name": "Synthetic tokenizer evaluation",
        "tokenizers": TOKENIZERS.iter().map(|t| t.0).collect::<Vec<_>>(),
        "languages": languages,
        "metrics": ["vocab_size", "fertility", "compression_ratio", "parity", "renyi_entropy"],
        "metric_shapes": {
            "parity": [TOKENIZERS.len(), n_lang, n_lang],
        },
        "languages_info": { "languages": info },
        "version": env!("CARGO_PKG_VERSION"),
    });

    // parity ships flat with a shape hint; renyi_entropy is listed but absent
    let results = json!({
        "vocab_size": encode_all(&vocab),
        "fertility": encode_rows(&fertility, n_lang),
        "compression_ratio": encode_rows(&compression, n_lang),
        "parity": encode_all(&parity),
    });

    let metadata_path = out_dir.join("metadata.json");
    let results_path = out_dir.join("results.json");
    std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)
        .with_context(|| format!("writing {}", metadata_path.display()))?;
    std::fs::write(&results_path, serde_json::to_string(&results)?)
        .with_context(|| format!("writing {}", results_path.display()))?;

    println!(
        "Wrote {} tokenizers × {} languages to {} and {}",
        TOKENIZERS.len(),
        n_lang,
        metadata_path.display(),
        results_path.display()
    );
    Ok(())
}
