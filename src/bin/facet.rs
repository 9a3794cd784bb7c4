use vitrine::{
    app::{self, AppConfig},
    experiences::facet::Facet,
};

fn main() -> anyhow::Result<()> {
    let config = AppConfig {
        title: "vitrine facet".to_string(),
        clear_colour: vitrine::Color {
            r: 0.02,
            g: 0.02,
            b: 0.04,
            a: 1.0,
        },
        ..Default::default()
    };
    app::run(config, Facet::new())
}
