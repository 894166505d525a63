const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const STEP: u64 = 1024;

pub fn pretty_size_from_bytes(bytes: u64) -> String {
    if bytes < STEP {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= STEP as f64 && unit < UNITS.len() - 1 {
        value /= STEP as f64;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
