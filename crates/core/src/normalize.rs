//! Best-effort extraction of a [`ParsedSpec`] from marketplace listing text.
//!
//! Listings are free-form and frequently mix Korean and English, so every
//! field is optional and falls back to the documented defaults. Nothing here
//! fails; an unparseable listing simply yields a default spec.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::domain::spec::{DEFAULT_RAM_GB, DEFAULT_REFRESH_RATE, DEFAULT_SSD_GB, UNKNOWN_CPU};
use crate::domain::{GpuTier, PanelType, ParsedSpec};

const ACCEPTED_REFRESH_RATES: [u32; 7] = [60, 90, 120, 144, 165, 240, 360];

/// Lazily compiled, case-insensitive pattern. Evaluates to `None` only if the
/// literal fails to compile.
macro_rules! pattern {
    ($source:literal) => {{
        static CELL: OnceLock<Option<Regex>> = OnceLock::new();
        CELL.get_or_init(|| Regex::new(concat!("(?i)", $source)).ok()).as_ref()
    }};
}

fn first_match<'t>(patterns: &[Option<&Regex>], text: &'t str) -> Option<&'t str> {
    patterns.iter().flatten().find_map(|pattern| pattern.find(text)).map(|found| found.as_str())
}

fn first_capture<'t>(pattern: Option<&Regex>, text: &'t str, group: usize) -> Option<&'t str> {
    pattern?.captures(text)?.get(group).map(|found| found.as_str())
}

fn contains_any(lower: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| lower.contains(needle))
}

/// Parses title and optional description into a spec.
pub fn parse_spec(title: &str, description: Option<&str>) -> ParsedSpec {
    let text = format!("{title} {}", description.unwrap_or_default());
    let lower = text.to_lowercase();

    let gpu = parse_gpu(&text, &lower);
    let gpu_tier = gpu.as_deref().map(GpuTier::from_gpu_name).unwrap_or(GpuTier::MIN);

    ParsedSpec {
        cpu: parse_cpu(&text, &lower),
        cpu_generation: parse_cpu_generation(&lower).map(str::to_string),
        gpu_vram_gb: parse_gpu_vram(&text),
        gpu,
        gpu_tier,
        ram_gb: parse_ram(&text),
        ram_type: parse_ram_type(&lower).map(str::to_string),
        ssd_gb: parse_ssd(&text),
        screen_size: parse_screen_size(&text),
        resolution: parse_resolution(&lower).map(str::to_string),
        refresh_rate: Some(parse_refresh_rate(&text)),
        panel_type: parse_panel_type(&lower),
        brightness_nits: parse_brightness(&text),
        weight_kg: parse_weight(&text),
        battery_wh: parse_battery(&text),
        usb_a_count: parse_usb_a(&text, &lower),
        usb_c_count: parse_usb_c(&text, &lower),
        thunderbolt: contains_any(&lower, &["thunderbolt", "썬더볼트"]),
        hdmi_version: parse_hdmi(&lower).map(str::to_string),
        sd_card: contains_any(&lower, &["sd카드", "sd card", "sdcard"]),
        lan_port: pattern!(r"\blan\b").is_some_and(|lan| lan.is_match(&text))
            || contains_any(&lower, &["이더넷", "rj45", "ethernet"]),
        wifi_version: parse_wifi(&lower).map(str::to_string),
        bluetooth_version: parse_bluetooth(&lower).map(str::to_string),
        pcie_generation: parse_pcie(&lower).map(str::to_string),
        has_npu: contains_any(&lower, &["npu", "ai 가속", "neural"]),
    }
}

fn parse_cpu(text: &str, lower: &str) -> String {
    let intel = [
        pattern!(r"intel\s+core\s+(?:ultra\s+)?\d+[\w-]+"),
        pattern!(r"core\s+(?:ultra\s+)?[i\d][\w-]+"),
        pattern!(r"i[3579]-\d{4,5}[a-z]*"),
        pattern!(r"ultra\s+[579]\s*-?\s*\d{3}[a-z]*"),
    ];
    let amd = [
        pattern!(r"ryzen\s+[379]\s+\d{4}[a-z]*"),
        pattern!(r"ryzen\s+ai\s+\d+"),
        pattern!(r"amd\s+ryzen[\w\s-]+"),
    ];
    if let Some(found) = first_match(&intel, text).or_else(|| first_match(&amd, text)) {
        return found.trim().to_string();
    }

    const APPLE: [(&str, &str); 8] = [
        ("m4 pro", "Apple M4 Pro"),
        ("m4 max", "Apple M4 Max"),
        ("m4", "Apple M4"),
        ("m3 pro", "Apple M3 Pro"),
        ("m3 max", "Apple M3 Max"),
        ("m3", "Apple M3"),
        ("m2 pro", "Apple M2 Pro"),
        ("m2", "Apple M2"),
    ];
    APPLE
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| UNKNOWN_CPU.to_string())
}

fn parse_cpu_generation(lower: &str) -> Option<&'static str> {
    const GENERATIONS: [(&[&str], &str); 11] = [
        (&["ultra", "arrow lake", "lunar lake"], "Intel 14th gen or newer"),
        (&["meteor lake", "raptor lake", "13세대", "13th gen"], "Intel 13th gen"),
        (&["alder lake", "12세대", "12th gen"], "Intel 12th gen"),
        (&["tiger lake", "11세대", "11th gen"], "Intel 11th gen"),
        (&["ryzen ai 300", "strix point"], "AMD Zen 5"),
        (&["ryzen 7000", "ryzen ai 7", "phoenix"], "AMD Zen 4"),
        (&["ryzen 6000", "rembrandt"], "AMD Zen 3+"),
        (&["ryzen 5000", "cezanne"], "AMD Zen 3"),
        (&["m4"], "Apple M4"),
        (&["m3"], "Apple M3"),
        (&["m2"], "Apple M2"),
    ];
    GENERATIONS
        .iter()
        .find(|(needles, _)| contains_any(lower, needles))
        .map(|(_, generation)| *generation)
}

fn parse_gpu(text: &str, lower: &str) -> Option<String> {
    if let Some(nvidia) = first_match(&[pattern!(r"(?:rtx|gtx)\s*\d{3,4}(?:\s*(?:ti|super)\b)?")], text)
    {
        return Some(format!("NVIDIA {}", nvidia.to_uppercase()));
    }
    if let Some(radeon) =
        first_match(&[pattern!(r"radeon\s*(?:rx\s*)?\d{3,4}[ms]?|radeon\s+\w+\d+[ms]?")], text)
    {
        return Some(radeon.to_string());
    }
    if lower.contains("iris xe") {
        return Some("Intel Iris Xe".to_string());
    }
    if lower.contains("iris plus") {
        return Some("Intel Iris Plus".to_string());
    }
    if lower.contains("uhd graphics") {
        return Some("Intel UHD Graphics".to_string());
    }
    None
}

fn parse_gpu_vram(text: &str) -> Option<u32> {
    first_capture(pattern!(r"(\d+)\s*gb\s*(?:gddr|vram|그래픽)"), text, 1)?.parse().ok()
}

fn parse_ram(text: &str) -> u32 {
    let patterns = [
        pattern!(r"(\d+)\s*gb\s*(?:ddr[45]?|lpddr[45]?|ram|메모리)"),
        pattern!(r"(?:ram|메모리)\s*(\d+)\s*gb"),
        pattern!(r"(\d+)\s*gb\s*x\s*\d+"),
    ];
    patterns
        .into_iter()
        .filter_map(|pattern| first_capture(pattern, text, 1))
        .filter_map(|value| value.parse::<u32>().ok())
        .find(|gb| (4..=256).contains(gb))
        .unwrap_or(DEFAULT_RAM_GB)
}

fn parse_ram_type(lower: &str) -> Option<&'static str> {
    ["lpddr5x", "lpddr5", "lpddr4x", "lpddr4", "ddr5", "ddr4"]
        .into_iter()
        .zip(["LPDDR5X", "LPDDR5", "LPDDR4X", "LPDDR4", "DDR5", "DDR4"])
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, name)| name)
}

fn parse_ssd(text: &str) -> u32 {
    let patterns = [
        pattern!(r"(\d+)\s*(tb|테라)\s*(?:ssd|nvme|저장)"),
        pattern!(r"(\d+)\s*(gb)\s*(?:ssd|nvme|저장)"),
        pattern!(r"(?:ssd|nvme|저장)\s*(\d+)\s*(gb|tb|테라)"),
    ];
    for pattern in patterns.into_iter().flatten() {
        let Some(captures) = pattern.captures(text) else {
            continue;
        };
        let (Some(amount), Some(unit)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let Ok(amount) = amount.as_str().parse::<u32>() else {
            continue;
        };
        if unit.as_str().eq_ignore_ascii_case("gb") {
            if amount >= 128 {
                return amount;
            }
        } else if (1..=16).contains(&amount) {
            return amount * 1024;
        }
    }
    DEFAULT_SSD_GB
}

fn parse_screen_size(text: &str) -> Option<f64> {
    first_capture(pattern!(r#"(\d{1,2}(?:\.\d)?)\s*(?:인치|inch|")"#), text, 1)?
        .parse::<f64>()
        .ok()
        .filter(|inches| (11.0..=18.0).contains(inches))
}

fn parse_resolution(lower: &str) -> Option<&'static str> {
    let uhd = lower.contains("uhd") && !lower.contains("uhd graphics");
    if uhd || contains_any(lower, &["4k", "3840"]) {
        Some("3840x2160")
    } else if contains_any(lower, &["2.8k", "2880"]) {
        Some("2880x1800")
    } else if contains_any(lower, &["2.5k", "2560x1600"]) {
        Some("2560x1600")
    } else if contains_any(lower, &["2k", "qhd", "2560x1440"]) {
        Some("2560x1440")
    } else if contains_any(lower, &["wuxga", "1920x1200"]) {
        Some("1920x1200")
    } else if contains_any(lower, &["fhd", "1920x1080", "full hd"]) {
        Some("1920x1080")
    } else if contains_any(lower, &["hd+", "1366"]) {
        Some("1366x768")
    } else {
        None
    }
}

/// Only common panel rates are trusted; anything else reads as 60 Hz.
fn parse_refresh_rate(text: &str) -> u32 {
    first_capture(pattern!(r"(\d+)\s*hz"), text, 1)
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|hz| ACCEPTED_REFRESH_RATES.contains(hz))
        .unwrap_or(DEFAULT_REFRESH_RATE)
}

fn parse_panel_type(lower: &str) -> Option<PanelType> {
    if contains_any(lower, &["oled", "amoled"]) {
        Some(PanelType::Oled)
    } else if contains_any(lower, &["mini-led", "mini led"]) {
        Some(PanelType::MiniLed)
    } else if lower.contains("ips") {
        Some(PanelType::Ips)
    } else if contains_any(lower, &["va panel", "va형"]) {
        Some(PanelType::Va)
    } else if pattern!(r"\btn\b").is_some_and(|tn| tn.is_match(lower)) {
        Some(PanelType::Tn)
    } else {
        None
    }
}

fn parse_brightness(text: &str) -> Option<u32> {
    first_capture(pattern!(r"(\d{3,4})\s*(?:nit|cd)"), text, 1)?
        .parse::<u32>()
        .ok()
        .filter(|nits| (200..=2000).contains(nits))
}

fn parse_weight(text: &str) -> Option<f64> {
    first_capture(pattern!(r"(\d+(?:\.\d+)?)\s*kg"), text, 1)?
        .parse::<f64>()
        .ok()
        .filter(|kg| (0.5..=5.0).contains(kg))
}

fn parse_battery(text: &str) -> Option<f64> {
    first_capture(pattern!(r"(\d+(?:\.\d+)?)\s*wh"), text, 1)?
        .parse::<f64>()
        .ok()
        .filter(|wh| (20.0..=200.0).contains(wh))
}

/// Counts need an explicit multiplier such as `USB-A x2`; a bare mention counts as one.
fn parse_usb_a(text: &str, lower: &str) -> Option<u8> {
    first_capture(pattern!(r"usb[-\s]?(?:type[-\s]?)?a\s*[x×]\s*(\d)"), text, 1)
        .and_then(|count| count.parse().ok())
        .or_else(|| contains_any(lower, &["usb-a", "usb type-a"]).then_some(1))
}

fn parse_usb_c(text: &str, lower: &str) -> Option<u8> {
    first_capture(pattern!(r"usb[-\s]?(?:type[-\s]?)?c\s*[x×]\s*(\d)"), text, 1)
        .and_then(|count| count.parse().ok())
        .or_else(|| contains_any(lower, &["usb-c", "usb type-c"]).then_some(1))
}

fn parse_hdmi(lower: &str) -> Option<&'static str> {
    if lower.contains("hdmi 2.1") {
        Some("2.1")
    } else if lower.contains("hdmi 1.4") {
        Some("1.4")
    } else if lower.contains("hdmi") {
        Some("2.0")
    } else {
        None
    }
}

fn parse_wifi(lower: &str) -> Option<&'static str> {
    if contains_any(lower, &["wi-fi 7", "wifi 7", "802.11be"]) {
        Some("Wi-Fi 7")
    } else if contains_any(lower, &["wi-fi 6e", "wifi 6e", "6ghz"]) {
        Some("Wi-Fi 6E")
    } else if contains_any(lower, &["wi-fi 6", "wifi 6", "802.11ax"]) {
        Some("Wi-Fi 6")
    } else if contains_any(lower, &["wi-fi 5", "802.11ac"]) {
        Some("Wi-Fi 5")
    } else {
        None
    }
}

fn parse_bluetooth(lower: &str) -> Option<&'static str> {
    if contains_any(lower, &["bluetooth 5.3", "bt 5.3"]) {
        Some("5.3")
    } else if contains_any(lower, &["bluetooth 5.2", "bt 5.2"]) {
        Some("5.2")
    } else if contains_any(lower, &["bluetooth 5.1", "bt 5.1"]) {
        Some("5.1")
    } else if contains_any(lower, &["bluetooth 5.0", "bt 5.0", "블루투스 5"]) {
        Some("5.0")
    } else if lower.contains("bluetooth 4.2") {
        Some("4.2")
    } else {
        None
    }
}

fn parse_pcie(lower: &str) -> Option<&'static str> {
    if contains_any(lower, &["pcie 5", "pci-e 5", "gen 5", "gen5"]) {
        Some("PCIe 5.0")
    } else if contains_any(lower, &["pcie 4", "pci-e 4", "gen 4", "gen4"]) {
        Some("PCIe 4.0")
    } else if contains_any(lower, &["pcie 3", "pci-e 3", "gen 3", "gen3"]) {
        Some("PCIe 3.0")
    } else {
        None
    }
}

/// January 1st of the first 2020s year mentioned in the title.
pub fn estimate_release_date(title: &str) -> Option<NaiveDate> {
    let year: i32 = first_capture(pattern!(r"(20(?:2\d))"), title, 1)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)
}
