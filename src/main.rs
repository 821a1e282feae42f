use avatar_viewer::config::ViewerConfig;

fn main() -> anyhow::Result<()> {
    avatar_viewer::viewer::run(ViewerConfig::default())
}
