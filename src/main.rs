use fluent_event_sink::app;

fn main() -> anyhow::Result<()> {
    app::run(app::main())?
}
