use super::ui;
use crate::core::{AllocationModel, AllocationWeights, PlanRequest, Tilt};
use anyhow::Result;
use comfy_table::Cell;
use tracing::info;

pub fn run(request: &PlanRequest, model: &AllocationModel) -> Result<()> {
    info!(
        risk = request.risk().value(),
        categories = request.categories().len(),
        "Allocating"
    );
    match model.allocate(request.risk(), request.categories()) {
        Ok(weights) => {
            println!("{}", allocation_table(request, model, &weights));
            Ok(())
        }
        Err(e) => super::report_plan_error(e),
    }
}

pub(crate) fn allocation_table(
    request: &PlanRequest,
    model: &AllocationModel,
    weights: &AllocationWeights,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Category"),
        ui::header_cell("Tilt"),
        ui::header_cell("Base"),
        ui::header_cell("Allocation"),
    ]);

    for (category, weight) in weights.iter() {
        if !request.categories().contains(&category) {
            continue;
        }
        let (name, emoji) = category.display_info();
        let tilt = match category.tilt() {
            Tilt::Defensive => "defensive",
            Tilt::Neutral => "neutral",
            Tilt::Aggressive => "aggressive",
        };
        let allocation = if weight > 0.0 {
            ui::format_percentage_cell(weight)
        } else {
            ui::na_cell(false)
        };
        table.add_row(vec![
            Cell::new(format!("{emoji} {name}")),
            Cell::new(ui::style_text(tilt, ui::StyleType::Subtle)),
            ui::number_cell(format!("{:.0}%", model.base_weight(category))),
            allocation,
        ]);
    }

    format!(
        "Risk tolerance: {}\n\n{table}",
        ui::style_text(
            &format!("{:.0}", request.risk().value()),
            ui::StyleType::Title
        )
    )
}
