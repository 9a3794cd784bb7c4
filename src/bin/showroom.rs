use vitrine::{
    app::{self, AppConfig},
    experiences::showroom::Showroom,
};

fn main() -> anyhow::Result<()> {
    let config = AppConfig {
        title: "vitrine showroom".to_string(),
        ..Default::default()
    };
    app::run(config, Showroom::new())
}
