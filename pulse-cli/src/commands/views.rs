use comfy_table::{Cell, Color, ContentArrangement, Row, Table, presets::UTF8_FULL};
use pulse_feed::ListingView;

pub fn execute() {
    println!("{}", views_table());
}

fn views_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(Row::from(vec![
            Cell::new("View").fg(Color::Cyan),
            Cell::new("Endpoint").fg(Color::Cyan),
            Cell::new("Filters").fg(Color::Cyan),
        ]));

    for view in ListingView::ALL {
        table.add_row(Row::from(vec![
            Cell::new(view.name()),
            Cell::new(view.endpoint()),
            Cell::new(view.filter_fields().join(", ")),
        ]));
    }
    table
}
