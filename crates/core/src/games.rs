//! 1080p frame-rate estimates per GPU tier for a fixed set of popular titles.

use serde::{Deserialize, Serialize};

use crate::domain::GpuTier;

/// Upper bound applied to every estimate.
pub const FPS_CAP: u16 = 360;

/// `[high, mid, low]` settings frame rates for tiers 1 through 10.
type FpsTable = [[u16; 3]; 10];

struct GameEntry {
    id: &'static str,
    name: &'static str,
    fps: FpsTable,
}

const GAMES: &[GameEntry] = &[
    GameEntry {
        id: "lol",
        name: "League of Legends",
        fps: [
            [80, 50, 30],
            [144, 90, 60],
            [200, 144, 100],
            [300, 200, 144],
            [360, 300, 200],
            [360, 360, 300],
            [360, 360, 360],
            [360, 360, 360],
            [360, 360, 360],
            [360, 360, 360],
        ],
    },
    GameEntry {
        id: "valorant",
        name: "Valorant",
        fps: [
            [60, 40, 25],
            [120, 80, 50],
            [165, 120, 80],
            [240, 165, 120],
            [360, 240, 165],
            [360, 360, 240],
            [360, 360, 360],
            [360, 360, 360],
            [360, 360, 360],
            [360, 360, 360],
        ],
    },
    GameEntry {
        id: "overwatch2",
        name: "Overwatch 2",
        fps: [
            [35, 20, 12],
            [70, 45, 30],
            [120, 80, 55],
            [165, 120, 80],
            [200, 165, 120],
            [240, 200, 165],
            [300, 240, 200],
            [360, 300, 240],
            [360, 360, 300],
            [360, 360, 360],
        ],
    },
    GameEntry {
        id: "pubg",
        name: "PUBG: Battlegrounds",
        fps: [
            [20, 12, 7],
            [40, 25, 15],
            [60, 40, 25],
            [90, 60, 40],
            [120, 90, 60],
            [144, 120, 90],
            [165, 144, 120],
            [200, 165, 144],
            [240, 200, 165],
            [300, 240, 200],
        ],
    },
    GameEntry {
        id: "gtav",
        name: "GTA V",
        fps: [
            [30, 18, 10],
            [60, 40, 25],
            [90, 65, 45],
            [120, 90, 65],
            [144, 120, 90],
            [165, 144, 120],
            [200, 165, 144],
            [240, 200, 165],
            [300, 240, 200],
            [360, 300, 240],
        ],
    },
    GameEntry {
        id: "cyberpunk2077",
        name: "Cyberpunk 2077",
        fps: [
            [10, 6, 3],
            [20, 12, 7],
            [35, 22, 13],
            [50, 35, 22],
            [65, 50, 35],
            [80, 65, 45],
            [100, 80, 60],
            [120, 100, 75],
            [144, 120, 90],
            [165, 144, 110],
        ],
    },
    GameEntry {
        id: "eldenring",
        name: "Elden Ring",
        fps: [
            [20, 12, 8],
            [40, 28, 18],
            [60, 45, 30],
            [80, 60, 45],
            [100, 80, 60],
            [120, 100, 80],
            [144, 120, 100],
            [144, 144, 120],
            [144, 144, 144],
            [144, 144, 144],
        ],
    },
    GameEntry {
        id: "diablo4",
        name: "Diablo IV",
        fps: [
            [25, 15, 8],
            [50, 30, 20],
            [80, 55, 35],
            [100, 80, 55],
            [120, 100, 80],
            [144, 120, 100],
            [165, 144, 120],
            [200, 165, 144],
            [240, 200, 165],
            [300, 240, 200],
        ],
    },
    GameEntry {
        id: "lostark",
        name: "Lost Ark",
        fps: [
            [50, 30, 20],
            [100, 70, 45],
            [144, 100, 70],
            [200, 144, 100],
            [240, 200, 144],
            [300, 240, 200],
            [360, 300, 240],
            [360, 360, 300],
            [360, 360, 360],
            [360, 360, 360],
        ],
    },
    GameEntry {
        id: "fc25",
        name: "EA Sports FC 25",
        fps: [
            [40, 25, 15],
            [80, 55, 35],
            [120, 85, 60],
            [144, 120, 85],
            [165, 144, 120],
            [200, 165, 144],
            [240, 200, 165],
            [300, 240, 200],
            [360, 300, 240],
            [360, 360, 300],
        ],
    },
    GameEntry {
        id: "maple",
        name: "MapleStory",
        fps: [
            [60, 40, 25],
            [120, 80, 55],
            [200, 144, 100],
            [300, 200, 144],
            [360, 300, 200],
            [360, 360, 300],
            [360, 360, 360],
            [360, 360, 360],
            [360, 360, 360],
            [360, 360, 360],
        ],
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Playability {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Playability {
    /// Target frame rate is the display refresh rate, capped at 60.
    pub fn classify(fps_mid: u16, refresh_rate: u32) -> Self {
        let target = f64::from(refresh_rate.min(60));
        let mid = f64::from(fps_mid);
        if mid >= target * 2.0 {
            Self::Excellent
        } else if mid >= target {
            Self::Good
        } else if mid >= target * 0.6 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Lower is better.
    pub fn rank(self) -> u8 {
        match self {
            Self::Excellent => 0,
            Self::Good => 1,
            Self::Fair => 2,
            Self::Poor => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEstimate {
    pub game_id: String,
    pub game_name: String,
    pub fps_high: u16,
    pub fps_mid: u16,
    pub fps_low: u16,
    pub playability: Playability,
    pub summary: String,
}

fn summarize(name: &str, high: u16, mid: u16, low: u16, playability: Playability) -> String {
    match playability {
        Playability::Excellent => {
            format!("Runs very smoothly even on maximum settings at {high} fps.")
        }
        Playability::Good if mid >= 60 => {
            format!("Plays smoothly on medium settings at {mid} fps.")
        }
        Playability::Good => format!("Playable on low settings at {low} fps."),
        Playability::Fair => {
            format!("Barely playable on low settings at {low} fps. Expect to lower options.")
        }
        Playability::Poor => format!("{name} will be hard to enjoy smoothly."),
    }
}

/// Estimates for all titles in table order.
pub fn estimate_game_fps(tier: GpuTier, refresh_rate: u32) -> Vec<GameEstimate> {
    let row = usize::from(tier.get()).saturating_sub(1);
    GAMES
        .iter()
        .map(|game| {
            let [high, mid, low] = game.fps.get(row).copied().unwrap_or(game.fps[0]);
            let (high, mid, low) = (high.min(FPS_CAP), mid.min(FPS_CAP), low.min(FPS_CAP));
            let playability = Playability::classify(mid, refresh_rate);
            GameEstimate {
                game_id: game.id.to_string(),
                game_name: game.name.to_string(),
                fps_high: high,
                fps_mid: mid,
                fps_low: low,
                playability,
                summary: summarize(game.name, high, mid, low, playability),
            }
        })
        .collect()
}

/// Best playability first; the sort is stable so table order breaks ties.
pub fn sort_for_display(estimates: &mut [GameEstimate]) {
    estimates.sort_by_key(|estimate| estimate.playability.rank());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_title_is_estimated_in_table_order() {
        let estimates = estimate_game_fps(GpuTier::new(5), 60);
        let ids: Vec<&str> = estimates.iter().map(|estimate| estimate.game_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "lol",
                "valorant",
                "overwatch2",
                "pubg",
                "gtav",
                "cyberpunk2077",
                "eldenring",
                "diablo4",
                "lostark",
                "fc25",
                "maple"
            ]
        );
    }

    #[test]
    fn top_tier_never_exceeds_the_cap() {
        for estimate in estimate_game_fps(GpuTier::MAX, 240) {
            assert!(estimate.fps_high <= FPS_CAP, "{estimate:?}");
            assert!(estimate.fps_mid <= FPS_CAP, "{estimate:?}");
            assert!(estimate.fps_low <= FPS_CAP, "{estimate:?}");
        }
    }

    #[test]
    fn playability_targets_at_most_sixty_fps() {
        assert_eq!(Playability::classify(120, 165), Playability::Excellent);
        assert_eq!(Playability::classify(119, 165), Playability::Good);
        assert_eq!(Playability::classify(60, 144), Playability::Good);
        assert_eq!(Playability::classify(40, 60), Playability::Fair);
        assert_eq!(Playability::classify(35, 60), Playability::Poor);
        assert_eq!(Playability::classify(30, 30), Playability::Good);
    }

    #[test]
    fn summaries_follow_playability_templates() {
        let estimates = estimate_game_fps(GpuTier::new(7), 165);
        let cyberpunk =
            estimates.iter().find(|estimate| estimate.game_id == "cyberpunk2077").expect("game");
        assert_eq!(cyberpunk.playability, Playability::Good);
        assert_eq!(cyberpunk.summary, "Plays smoothly on medium settings at 80 fps.");

        let low_end = estimate_game_fps(GpuTier::MIN, 60);
        let pubg = low_end.iter().find(|estimate| estimate.game_id == "pubg").expect("game");
        assert_eq!(pubg.playability, Playability::Poor);
        assert_eq!(pubg.summary, "PUBG: Battlegrounds will be hard to enjoy smoothly.");

        let lol = low_end.iter().find(|estimate| estimate.game_id == "lol").expect("game");
        assert_eq!(lol.playability, Playability::Fair);
        assert!(lol.summary.starts_with("Barely playable on low settings at 30 fps."));
    }

    #[test]
    fn display_sort_keeps_table_order_within_a_rank() {
        let mut estimates = estimate_game_fps(GpuTier::new(3), 60);
        sort_for_display(&mut estimates);

        assert!(estimates
            .windows(2)
            .all(|pair| pair[0].playability.rank() <= pair[1].playability.rank()));
        let excellent: Vec<&str> = estimates
            .iter()
            .filter(|estimate| estimate.playability == Playability::Excellent)
            .map(|estimate| estimate.game_id.as_str())
            .collect();
        assert_eq!(excellent, vec!["lol", "valorant", "maple"]);
    }
}
