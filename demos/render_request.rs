use render_context::{
    ClientEvent, ClientLibrary, CombiningFormatter, ContextConfig, CssMinifier, DefType,
    Descriptor, EventType, Freshness, MemoryRegistry, SyncContext, SyncError,
};

fn main() -> Result<(), SyncError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let cmp = |name: &str| Descriptor::new(DefType::Component, "markup", "ui", name);

    let mut registry = MemoryRegistry::new();
    registry.insert(cmp("icon"), "<svg/>", vec![]);
    registry.insert(cmp("button"), "<button><ui:icon/></button>", vec![cmp("icon")]);
    registry.insert(cmp("form"), "<form><ui:button/><ui:button/></form>", vec![cmp("button")]);
    let refresh = Descriptor::new(DefType::Event, "markup", "aura", "refresh");
    registry.insert_event(refresh.clone(), "<aura:event type='APPLICATION'/>", EventType::Application);

    let config = ContextConfig::from_json_str(r#"{ "defaultMode": "DEV" }"#)?;
    let request = r#"{
        "app": "aura:demo",
        "num": "1",
        "loaded": { "COMPONENT@markup://ui:icon": "stale-uid" }
    }"#;
    let mut ctx = SyncContext::from_client(request, &config)?;

    // Render ui:form, which references ui:button twice.
    let form = ctx.instantiate(cmp("form"));
    {
        let mut scope = ctx.enter_component(form);
        let mut scope = scope.enter_namespace("ui");
        for _ in 0..2 {
            let button = scope.descriptor("button", DefType::Component)?;
            match scope.check_freshness(&registry, &button)? {
                Freshness::AlreadyChecked => println!("{} already checked", button),
                other => println!("{} is {:?}", button, other),
            }
            let instance = scope.instantiate(button);
            let _child = scope.enter_component(instance);
        }
        let icon = scope.descriptor("icon", DefType::Component)?;
        println!("{} is {:?}", icon, scope.check_freshness(&registry, &icon)?);
    }
    ctx.mark_loaded(&registry, &cmp("form"))?;
    ctx.add_client_application_event(&registry, ClientEvent::new(refresh))?;

    let stylesheets = vec![
        Some(ClientLibrary::new("/libs/reset.css", "html { margin: 0; }\n")),
        None,
        Some(ClientLibrary::new("/libs/form.css", ".form  .button {\n  color: #333;\n}\n")),
    ];
    let mut css = String::new();
    CombiningFormatter::new(CssMinifier).write_collection(ctx.mode(), &stylesheets, &mut css)?;

    println!("--- css ({}) ---\n{}", ctx.mode(), css);
    println!("--- context ---\n{}", ctx.to_json()?);
    Ok(())
}
