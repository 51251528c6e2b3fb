use serde::{Deserialize, Serialize};

use crate::domain::{PanelType, ParsedSpec};

const QHD_WIDTH: u32 = 2560;
const UHD_WIDTH: u32 = 3840;
const MEDIA_BRIGHTNESS_NITS: u32 = 400;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySuitability {
    pub for_documents: bool,
    pub for_media: bool,
    pub for_gaming: bool,
    pub for_design: bool,
    pub summary: String,
}

pub fn analyze_display_suitability(spec: &ParsedSpec) -> DisplaySuitability {
    let width = spec.horizontal_pixels().unwrap_or_default();
    let high_res = width >= QHD_WIDTH;
    let bright = spec.brightness_nits.is_some_and(|nits| nits >= MEDIA_BRIGHTNESS_NITS);
    let refresh = spec.effective_refresh_rate();

    let mut clauses = Vec::new();
    if spec.is_oled() {
        clauses.push("The OLED panel delivers excellent color".to_string());
    }
    if refresh >= 144 {
        clauses.push(format!("The {refresh}Hz high refresh rate suits gaming"));
    }
    if width >= UHD_WIDTH {
        clauses.push("4K resolution gives a very sharp picture".to_string());
    } else if high_res {
        clauses.push("QHD resolution is well suited to productivity work".to_string());
    }
    if clauses.is_empty() {
        clauses.push("Fine for everyday documents and video watching".to_string());
    }

    DisplaySuitability {
        for_documents: true,
        for_media: spec.is_oled() || bright || high_res,
        for_gaming: refresh >= 120,
        for_design: high_res || spec.is_oled(),
        summary: format!("{}.", clauses.join(". ")),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSuitability {
    pub can_dual_monitor: bool,
    pub can_external_gpu: bool,
    pub port_score: u8,
    pub summary: String,
    pub details: Vec<String>,
}

pub fn analyze_port_suitability(spec: &ParsedSpec) -> PortSuitability {
    let usb_a = u32::from(spec.usb_a_count.unwrap_or_default());
    let usb_c = u32::from(spec.usb_c_count.unwrap_or_default());
    let has_hdmi = spec.hdmi_version.is_some();
    let can_dual_monitor = usb_c >= 2 || (has_hdmi && usb_c >= 1) || spec.thunderbolt;
    let few_ports = usb_c == 0 && usb_a <= 1;

    let mut score = 40 + usb_a * 10 + usb_c * 15;
    if spec.thunderbolt {
        score += 20;
    }
    if has_hdmi {
        score += 10;
    }
    if spec.sd_card {
        score += 10;
    }
    if spec.lan_port {
        score += 5;
    }

    let mut details = Vec::new();
    if spec.thunderbolt {
        details.push("Thunderbolt support: external GPUs can be attached".to_string());
    }
    if can_dual_monitor {
        details.push("Can drive two external monitors".to_string());
    }
    if !spec.lan_port {
        details.push("No wired LAN port (needs a USB adapter)".to_string());
    }
    if few_ports {
        details.push("Few ports; a USB hub is recommended".to_string());
    }

    let summary = if spec.thunderbolt && can_dual_monitor {
        "Plenty of ports, including dual monitor output and external GPU support."
    } else if can_dual_monitor {
        "Can connect two external monitors."
    } else if few_ports {
        "Ports are limited. A USB hub is recommended."
    } else {
        "Enough ports for basic connectivity."
    };

    PortSuitability {
        can_dual_monitor,
        can_external_gpu: spec.thunderbolt,
        port_score: score.min(100) as u8,
        summary: summary.to_string(),
        details,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechFeatures {
    pub wifi6: bool,
    pub wifi6e: bool,
    pub wifi7: bool,
    pub bt5: bool,
    pub bt53: bool,
    pub ddr5: bool,
    pub pcie_gen4: bool,
    pub pcie_gen5: bool,
    pub npu: bool,
    pub oled: bool,
    pub mini_led: bool,
    pub thunderbolt4: bool,
    pub highlights: Vec<String>,
}

pub fn analyze_tech_features(spec: &ParsedSpec) -> TechFeatures {
    let wifi = spec.wifi_version.as_deref().unwrap_or_default();
    let wifi7 = wifi.contains("Wi-Fi 7");
    let wifi6e = wifi.contains("Wi-Fi 6E");
    let wifi6 = wifi.contains("Wi-Fi 6") && !wifi6e && !wifi7;
    let bluetooth = spec.bluetooth_version.as_deref().unwrap_or_default();
    let ddr5 = spec.ram_type.as_deref().is_some_and(|ram| ram.to_uppercase().contains("DDR5"));
    let pcie = spec
        .pcie_generation
        .as_deref()
        .and_then(|generation| generation.chars().find(char::is_ascii_digit))
        .and_then(|digit| digit.to_digit(10))
        .unwrap_or_default();
    let pcie_gen5 = pcie >= 5;
    let pcie_gen4 = pcie == 4;

    let mut highlights = Vec::new();
    if wifi7 {
        highlights.push("Wi-Fi 7 wireless");
    } else if wifi6e {
        highlights.push("Wi-Fi 6E fast wireless");
    }
    if ddr5 {
        highlights.push("DDR5 memory");
    }
    if pcie_gen5 {
        highlights.push("PCIe 5.0 ultra-fast SSD");
    } else if pcie_gen4 {
        highlights.push("PCIe 4.0 fast SSD");
    }
    if spec.has_npu {
        highlights.push("NPU for on-device AI");
    }
    if spec.is_oled() {
        highlights.push("OLED display");
    }
    if spec.thunderbolt {
        highlights.push("Thunderbolt 4");
    }

    TechFeatures {
        wifi6,
        wifi6e,
        wifi7,
        bt5: matches!(bluetooth, "5.0" | "5.1"),
        bt53: matches!(bluetooth, "5.2" | "5.3"),
        ddr5,
        pcie_gen4,
        pcie_gen5,
        npu: spec.has_npu,
        oled: spec.is_oled(),
        mini_led: spec.panel_type == Some(PanelType::MiniLed),
        thunderbolt4: spec.thunderbolt,
        highlights: highlights.into_iter().map(str::to_string).collect(),
    }
}
