use serde::{Deserialize, Serialize};

/// Sentinel used when no CPU model could be recognised.
pub const UNKNOWN_CPU: &str = "unknown";

/// Legacy sentinel written by older catalog imports.
pub const UNKNOWN_CPU_LEGACY: &str = "알 수 없음";

pub const DEFAULT_RAM_GB: u32 = 16;
pub const DEFAULT_SSD_GB: u32 = 512;
pub const DEFAULT_REFRESH_RATE: u32 = 60;

/// Coarse graphics performance bucket: 1 is integrated graphics, 10 is a top-tier
/// discrete GPU. Always within `[1, 10]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct GpuTier(u8);

/// Ordered substring table; the first key contained in the lowercased GPU name wins,
/// so "ti" variants are listed ahead of their base model.
const GPU_TIER_TABLE: &[(&str, u8)] = &[
    ("iris xe", 1),
    ("iris plus", 1),
    ("uhd", 1),
    ("radeon 890m", 2),
    ("radeon 780m", 2),
    ("radeon 760m", 1),
    ("radeon 680m", 1),
    ("mx550", 2),
    ("mx450", 2),
    ("mx350", 1),
    ("rtx 4090", 10),
    ("rtx 4080", 9),
    ("rtx 4070", 8),
    ("rtx 4060", 7),
    ("rtx 4050", 6),
    ("rtx 3080 ti", 8),
    ("rtx 3080", 7),
    ("rtx 3070 ti", 7),
    ("rtx 3070", 6),
    ("rtx 3060", 6),
    ("rtx 3050 ti", 5),
    ("rtx 3050", 4),
    ("rtx 2080", 6),
    ("rtx 2070", 5),
    ("rtx 2060", 5),
    ("gtx 1660 ti", 4),
    ("gtx 1650 ti", 3),
    ("gtx 1650", 3),
    ("gtx 1050 ti", 2),
    ("gtx 1050", 2),
    ("rx 7900m", 9),
    ("rx 7700s", 7),
    ("rx 7600m", 6),
    ("rx 6850m", 7),
    ("rx 6800m", 6),
    ("rx 6700m", 5),
    ("rx 6600m", 5),
    ("rx 6500m", 3),
];

impl GpuTier {
    pub const MIN: GpuTier = GpuTier(1);
    pub const MAX: GpuTier = GpuTier(10);

    pub fn new(tier: i64) -> Self {
        Self(tier.clamp(1, 10) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Looks up the tier for a GPU model string. Unknown or empty names fall back
    /// to tier 1 (treated as integrated graphics).
    pub fn from_gpu_name(gpu: &str) -> Self {
        let lower = gpu.to_lowercase();
        if lower.trim().is_empty() {
            return Self::MIN;
        }

        GPU_TIER_TABLE
            .iter()
            .find(|(key, _)| lower.contains(key))
            .map(|(_, tier)| Self(*tier))
            .unwrap_or(Self::MIN)
    }
}

impl Default for GpuTier {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<i64> for GpuTier {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<GpuTier> for u8 {
    fn from(value: GpuTier) -> Self {
        value.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelType {
    #[serde(rename = "OLED")]
    Oled,
    #[serde(rename = "Mini-LED")]
    MiniLed,
    #[serde(rename = "IPS")]
    Ips,
    #[serde(rename = "VA")]
    Va,
    #[serde(rename = "TN")]
    Tn,
}

/// Normalized hardware description of one laptop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedSpec {
    pub cpu: String,
    pub cpu_generation: Option<String>,
    pub gpu: Option<String>,
    pub gpu_vram_gb: Option<u32>,
    pub gpu_tier: GpuTier,
    pub ram_gb: u32,
    pub ram_type: Option<String>,
    pub ssd_gb: u32,
    pub screen_size: Option<f64>,
    pub resolution: Option<String>,
    pub refresh_rate: Option<u32>,
    pub panel_type: Option<PanelType>,
    pub brightness_nits: Option<u32>,
    pub weight_kg: Option<f64>,
    pub battery_wh: Option<f64>,
    pub usb_a_count: Option<u8>,
    pub usb_c_count: Option<u8>,
    pub thunderbolt: bool,
    pub hdmi_version: Option<String>,
    pub sd_card: bool,
    pub lan_port: bool,
    pub wifi_version: Option<String>,
    pub bluetooth_version: Option<String>,
    pub pcie_generation: Option<String>,
    pub has_npu: bool,
}

impl Default for ParsedSpec {
    fn default() -> Self {
        Self {
            cpu: UNKNOWN_CPU.to_string(),
            cpu_generation: None,
            gpu: None,
            gpu_vram_gb: None,
            gpu_tier: GpuTier::MIN,
            ram_gb: DEFAULT_RAM_GB,
            ram_type: None,
            ssd_gb: DEFAULT_SSD_GB,
            screen_size: None,
            resolution: None,
            refresh_rate: Some(DEFAULT_REFRESH_RATE),
            panel_type: None,
            brightness_nits: None,
            weight_kg: None,
            battery_wh: None,
            usb_a_count: None,
            usb_c_count: None,
            thunderbolt: false,
            hdmi_version: None,
            sd_card: false,
            lan_port: false,
            wifi_version: None,
            bluetooth_version: None,
            pcie_generation: None,
            has_npu: false,
        }
    }
}

impl ParsedSpec {
    pub fn is_oled(&self) -> bool {
        self.panel_type == Some(PanelType::Oled)
    }

    /// Refresh rate with absent or zero values read as the 60 Hz default.
    pub fn effective_refresh_rate(&self) -> u32 {
        self.refresh_rate.filter(|hz| *hz > 0).unwrap_or(DEFAULT_REFRESH_RATE)
    }

    /// Horizontal pixel count parsed from a `WIDTHxHEIGHT` resolution string.
    pub fn horizontal_pixels(&self) -> Option<u32> {
        let resolution = self.resolution.as_deref()?;
        let (width, _) = resolution.split_once(|c: char| matches!(c, 'x' | 'X' | '×'))?;
        width.trim().parse().ok()
    }

    pub fn cpu_is_unknown(&self) -> bool {
        let cpu = self.cpu.trim();
        cpu.is_empty() || cpu == UNKNOWN_CPU || cpu == UNKNOWN_CPU_LEGACY
    }
}
