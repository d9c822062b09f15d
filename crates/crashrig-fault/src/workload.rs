//! Synthetic CPU workload for the hang fault.
//!
//! A watchdog that kills an unresponsive process usually captures a
//! backtrace first.  One bare spin loop would make every hang report
//! identical, so the hang burns CPU through a tree of `#[inline(never)]`
//! functions with names from five everyday domains (network, JSON,
//! image processing, database, UI layout).  A sampling profiler over
//! this workload produces a plausible application flamegraph.
//!
//! The work is pure computation with no yielding and no suspension
//! points.  Results feed [`black_box`] so the optimizer cannot delete
//! the frames.

use std::hint::black_box;
use std::time::{Duration, Instant};

use rand::Rng;

/// Busy the calling thread with synthetic work until `duration` elapses.
///
/// Never yields.  Each loop iteration picks one domain uniformly at
/// random, so consecutive watchdog samples land in different subtrees.
pub fn run_for(duration: Duration) {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        dispatch_workload();
    }
}

#[inline(never)]
fn dispatch_workload() {
    match rand::thread_rng().gen_range(0..5) {
        0 => perform_network_simulation(),
        1 => perform_json_processing(),
        2 => perform_image_processing(),
        3 => perform_database_simulation(),
        _ => perform_ui_layout_calculation(),
    }
}

// ── Network simulation ──────────────────────────────────────────────

#[inline(never)]
fn perform_network_simulation() {
    parse_http_headers();
    deserialize_response_body();
    validate_ssl_certificate();
}

#[inline(never)]
fn parse_http_headers() {
    let raw = "Content-Type: application/json\r\nX-Request-Id: 51de9e74\r\nCache-Control: no-store";
    for _ in 0..50 {
        let fields: Vec<String> = raw
            .split("\r\n")
            .map(|line| line.to_ascii_lowercase())
            .collect();
        black_box(fields);
    }
}

#[inline(never)]
fn deserialize_response_body() {
    decode_hex_payload();
    uncompress_response_data();
}

#[inline(never)]
fn decode_hex_payload() {
    for _ in 0..30 {
        let payload = "abc123".repeat(100);
        let encoded: String = payload.bytes().map(|b| format!("{b:02x}")).collect();
        black_box(encoded);
    }
}

#[inline(never)]
fn uncompress_response_data() {
    let mut out = Vec::with_capacity(5000);
    for i in 0..5000u32 {
        out.push((i % 256) as u8);
    }
    let sum: u64 = out.iter().map(|&b| u64::from(b)).sum();
    black_box(sum);
}

#[inline(never)]
fn validate_ssl_certificate() {
    compute_certificate_hash();
    verify_certificate_chain();
}

#[inline(never)]
fn compute_certificate_hash() {
    let mut hash = 0u64;
    for i in 0..10_000u64 {
        hash = hash.wrapping_mul(31).wrapping_add(i);
    }
    black_box(hash);
}

#[inline(never)]
fn verify_certificate_chain() {
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let mut serials: Vec<u32> = (0..100).map(|_| rng.gen()).collect();
        serials.sort_unstable();
        black_box(serials);
    }
}

// ── JSON processing ─────────────────────────────────────────────────

#[inline(never)]
fn perform_json_processing() {
    tokenize_json_string();
    build_syntax_tree();
    map_tree_to_models();
}

#[inline(never)]
fn tokenize_json_string() {
    let json = "{\"key\":\"value\"},".repeat(200);
    let mut classified = 0usize;
    for c in json.chars() {
        if c.is_alphanumeric() || c.is_ascii_punctuation() {
            classified += 1;
        }
    }
    black_box(classified);
}

#[inline(never)]
fn build_syntax_tree() {
    parse_object_node();
    parse_array_node();
}

#[inline(never)]
fn parse_object_node() {
    let mut object = std::collections::BTreeMap::new();
    for i in 0..500u32 {
        object.insert(format!("key_{i}"), i * 2);
    }
    let total: u32 = object.values().sum();
    black_box(total);
}

#[inline(never)]
fn parse_array_node() {
    let mut arrays: Vec<Vec<u32>> = Vec::new();
    for _ in 0..50 {
        arrays.push((0..100).collect());
    }
    let flat: usize = arrays.iter().map(Vec::len).sum();
    black_box(flat);
}

#[inline(never)]
fn map_tree_to_models() {
    struct Model {
        id: u32,
        value: f64,
    }
    let mut models = Vec::new();
    for i in 0..200u32 {
        models.push(Model {
            id: i,
            value: f64::from(i) * 1.5,
        });
    }
    let sum: f64 = models.iter().map(|m| m.value + f64::from(m.id)).sum();
    black_box(sum);
}

// ── Image processing ────────────────────────────────────────────────

#[inline(never)]
fn perform_image_processing() {
    decode_pixel_buffer();
    apply_color_transform();
    encode_compressed_output();
}

#[inline(never)]
fn decode_pixel_buffer() {
    let mut pixels: Vec<u32> = Vec::with_capacity(2000);
    let mut rng = rand::thread_rng();
    for _ in 0..2000 {
        pixels.push(rng.gen());
    }
    let channels: Vec<u32> = pixels.iter().map(|p| p & 0xFF).collect();
    black_box(channels);
}

#[inline(never)]
fn apply_color_transform() {
    convert_rgb_to_hsl();
    adjust_saturation();
}

#[inline(never)]
fn convert_rgb_to_hsl() {
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let r: f64 = rng.gen();
        let g: f64 = rng.gen();
        let b: f64 = rng.gen();
        let max_c = r.max(g).max(b);
        let min_c = r.min(g).min(b);
        black_box((max_c + min_c) / 2.0);
    }
}

#[inline(never)]
fn adjust_saturation() {
    let mut rng = rand::thread_rng();
    let values: Vec<f64> = (0..1000).map(|_| rng.gen::<f64>() * 1.2).collect();
    let clamped: Vec<f64> = values.iter().map(|v| v.min(1.0)).collect();
    black_box(clamped);
}

#[inline(never)]
fn encode_compressed_output() {
    let mut compressed = Vec::with_capacity(3000);
    for i in 0..3000u32 {
        compressed.push((i % 256) as u8);
    }
    black_box(compressed.len());
}

// ── Database simulation ─────────────────────────────────────────────

#[inline(never)]
fn perform_database_simulation() {
    parse_query_statement();
    execute_query_plan();
}

#[inline(never)]
fn parse_query_statement() {
    let sql = "SELECT id, name, value FROM users WHERE status = 'active' ORDER BY created_at DESC LIMIT 100";
    for _ in 0..100 {
        let keywords: Vec<String> = sql
            .split_whitespace()
            .map(|w| w.to_ascii_uppercase())
            .collect();
        black_box(keywords);
    }
}

#[inline(never)]
fn execute_query_plan() {
    scan_table_index();
    join_related_tables();
    sort_result_rows();
}

#[inline(never)]
fn scan_table_index() {
    let mut index = std::collections::BTreeMap::new();
    for i in 0..1000u32 {
        index.insert(i, format!("row_{i}"));
    }
    let even = index.keys().filter(|k| *k % 2 == 0).count();
    black_box(even);
}

#[inline(never)]
fn join_related_tables() {
    let left: Vec<(u32, u32)> = (0..200).map(|i| (i, i)).collect();
    let right: Vec<(u32, u32)> = (0..200).map(|i| (i, i * 2)).collect();
    let mut joined = Vec::new();
    for &(lk, lv) in &left {
        for &(rk, rv) in &right {
            if lk == rk {
                joined.push((lk, lv, rv));
            }
        }
    }
    black_box(joined.len());
}

#[inline(never)]
fn sort_result_rows() {
    let mut rng = rand::thread_rng();
    let mut rows: Vec<u32> = (0..500).map(|_| rng.gen()).collect();
    rows.sort_unstable();
    black_box(rows.first().copied());
}

// ── UI layout ───────────────────────────────────────────────────────

#[inline(never)]
fn perform_ui_layout_calculation() {
    measure_text_content();
    solve_layout_constraints();
    resolve_layout_pass();
}

#[inline(never)]
fn measure_text_content() {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    let mut widths = Vec::with_capacity(text.len());
    for c in text.chars() {
        widths.push(f64::from(c as u32 & 0x7F) * 0.6);
    }
    let total: f64 = widths.iter().sum();
    black_box(total);
}

#[inline(never)]
fn solve_layout_constraints() {
    let mut matrix: Vec<Vec<f64>> = Vec::with_capacity(50);
    for i in 0..50 {
        matrix.push((0..50).map(|j| f64::from(i + j)).collect());
    }
    let total: f64 = matrix.iter().map(|row| row.iter().sum::<f64>()).sum();
    black_box(total);
}

#[inline(never)]
fn resolve_layout_pass() {
    let mut frames = Vec::with_capacity(100);
    for i in 0..100u32 {
        let x = f64::from(i % 10) * 50.0;
        let y = f64::from(i / 10) * 50.0;
        frames.push((x, y, 45.0f64, 45.0f64));
    }
    let area: f64 = frames.iter().map(|f| f.2 * f.3).sum();
    black_box(area);
}
