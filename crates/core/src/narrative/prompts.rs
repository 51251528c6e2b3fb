//! Prompt builders. Every prompt is derived from engine output only and ends
//! with the JSON shape the model must answer in.

use std::fmt::Write as _;

use crate::domain::{ParsedSpec, RecommendRequest};
use crate::format::format_krw;
use crate::games::Playability;
use crate::recommend::Recommendation;
use crate::report::ProductReport;

const MAX_PROMPT_GAMES: usize = 4;
const MAX_PROMPT_RECOMMENDATIONS: usize = 3;

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_else(|| "?".to_string())
}

fn gpu_line(spec: &ParsedSpec) -> String {
    let gpu = spec.gpu.clone().unwrap_or_else(|| "integrated graphics".to_string());
    match spec.gpu_vram_gb {
        Some(vram) => format!("{gpu} {vram}GB"),
        None => gpu,
    }
}

pub fn analysis_prompt(report: &ProductReport) -> String {
    let spec = &report.spec;
    let price = &report.price;
    let scores = &report.scores;

    let games = report
        .games
        .iter()
        .filter(|game| game.playability != Playability::Poor)
        .take(MAX_PROMPT_GAMES)
        .map(|game| format!("{}: {} fps on medium", game.game_name, game.fps_mid))
        .collect::<Vec<_>>()
        .join(", ");
    let games = if games.is_empty() { "weak gaming performance".to_string() } else { games };

    let release = match report.months_since_release {
        Some(months) if months > 0 => format!("released {months} months ago"),
        _ => "release date unknown".to_string(),
    };
    let cpu = match &spec.cpu_generation {
        Some(generation) => format!("{} ({generation})", spec.cpu),
        None => spec.cpu.clone(),
    };
    let ram = match &spec.ram_type {
        Some(kind) => format!("{}GB {kind}", spec.ram_gb),
        None => format!("{}GB", spec.ram_gb),
    };
    let panel = spec
        .panel_type
        .and_then(|panel| serde_json::to_value(panel).ok())
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default();

    format!(
        "You are a laptop expert. Analyse the laptop below in plain English that a beginner can \
follow. Answer with JSON only. Keep explanations short and explain technical terms simply.

## Product
- Name: {name}
- CPU: {cpu}
- GPU: {gpu}
- RAM: {ram}
- SSD: {ssd}GB
- Display: {size}\" {resolution} {refresh}Hz {panel}
- Weight: {weight}kg
- {release}

## Price
- Lowest: {lowest}
- 30-day average: {avg}
- Price status: {summary}

## Scores (out of 100)
- Gaming: {gaming}
- Work/coding: {work}
- Student: {student}
- Video editing: {video}
- Portability: {portable}

## Game performance
{games}

## Response format (JSON)
{{
  \"pros\": [\"pro 1\", \"pro 2\", \"pro 3\"],
  \"cons\": [\"con 1\", \"con 2\", \"con 3\"],
  \"usage_summaries\": {{
    \"gaming\": \"one-line gaming verdict\",
    \"work\": \"one-line work verdict\",
    \"student\": \"one-line student verdict\",
    \"video\": \"one-line video editing verdict\",
    \"portable\": \"one-line portability verdict\"
  }},
  \"should_buy_conclusion\": \"whether to buy now, in 2-3 sentences\",
  \"best_for\": \"who this laptop suits, in one sentence\"
}}",
        name = report.product.name,
        gpu = gpu_line(spec),
        ssd = spec.ssd_gb,
        size = or_unknown(spec.screen_size),
        resolution = spec.resolution.clone().unwrap_or_default(),
        refresh = spec.effective_refresh_rate(),
        weight = or_unknown(spec.weight_kg),
        lowest = format_krw(price.current_lowest),
        avg = price
            .avg_30d
            .map(|avg| format_krw(avg.round() as i64))
            .unwrap_or_else(|| "?".to_string()),
        summary = price.summary,
        gaming = scores.gaming,
        work = scores.work,
        student = scores.student,
        video = scores.video,
        portable = scores.portable,
    )
}

pub fn comparison_prompt(reports: &[ProductReport]) -> String {
    let mut products = String::new();
    for (index, report) in reports.iter().enumerate() {
        let spec = &report.spec;
        let scores = &report.scores;
        let _ = write!(
            products,
            "\n### Product {number}: {name}\n\
             - CPU: {cpu}, GPU: {gpu}\n\
             - RAM: {ram}GB, SSD: {ssd}GB\n\
             - Display: {size}\" {refresh}Hz\n\
             - Weight: {weight}kg\n\
             - Lowest price: {price}\n\
             - Scores: gaming {gaming} / work {work} / student {student} / portability {portable}\n",
            number = index + 1,
            name = report.product.name,
            cpu = spec.cpu,
            gpu = gpu_line(spec),
            ram = spec.ram_gb,
            ssd = spec.ssd_gb,
            size = or_unknown(spec.screen_size),
            refresh = spec.effective_refresh_rate(),
            weight = or_unknown(spec.weight_kg),
            price = format_krw(report.price.current_lowest),
            gaming = scores.gaming,
            work = scores.work,
            student = scores.student,
            portable = scores.portable,
        );
    }

    format!(
        "You are a laptop expert. Compare the {count} laptops below in plain English. Contrast \
their strengths and weaknesses and say which buyer each one suits. Answer with JSON only.
{products}
## Response format (JSON)
{{
  \"summary\": \"overall comparison in 2-3 sentences\",
  \"winner\": {{
    \"gaming\": \"best product for gaming\",
    \"work\": \"best product for work\",
    \"student\": \"best product for students\",
    \"portable\": \"most portable product\",
    \"value\": \"best value product\"
  }},
  \"recommendations\": [
    {{\"persona\": \"kind of buyer\", \"product\": \"recommended product\", \"reason\": \"why\"}}
  ],
  \"conclusion\": \"final verdict in 3-4 sentences\"
}}",
        count = reports.len(),
    )
}

pub fn recommend_prompt(request: &RecommendRequest, recommendations: &[Recommendation]) -> String {
    let usage = if request.usage.is_empty() {
        "general".to_string()
    } else {
        request.usage.iter().map(|usage| usage.label()).collect::<Vec<_>>().join(", ")
    };
    let budget = request
        .budget
        .map(|budget| format!("{} - {}", format_krw(budget.min), format_krw(budget.max)))
        .unwrap_or_else(|| "no limit".to_string());
    let priority = request.priority.map(|priority| priority.as_str()).unwrap_or("none");

    let mut candidates = String::new();
    for (index, recommendation) in
        recommendations.iter().take(MAX_PROMPT_RECOMMENDATIONS).enumerate()
    {
        let _ = write!(
            candidates,
            "\n{rank}. {name}\n   - Price: {price}\n   - Usage scores: gaming {gaming} / work \
             {work}\n   - Match score: {score:.0}\n",
            rank = index + 1,
            name = recommendation.product.name,
            price = format_krw(recommendation.current_lowest),
            gaming = recommendation.scores.gaming,
            work = recommendation.scores.work,
            score = recommendation.match_score,
        );
    }

    format!(
        "You are a laptop buying consultant. Explain in plain English why these laptops fit the \
buyer's needs. Answer with JSON only.

## Buyer needs
- Budget: {budget}
- Usage: {usage}
- Priority: {priority}

## Candidates
{candidates}
## Response format (JSON)
{{
  \"intro\": \"one line showing you understand the buyer\",
  \"recommendations\": [
    {{
      \"rank\": 1,
      \"name\": \"product name\",
      \"reason\": \"why this laptop is recommended, 2-3 sentences\",
      \"highlight\": \"its key strength in one line\"
    }}
  ],
  \"tip\": \"a buying tip or caveat in 1-2 sentences\"
}}"
    )
}
