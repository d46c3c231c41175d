use sdui_shell_runtime::{
    ComponentRegistry, HostError, ShellConfig, logging, register_builtin_components,
    register_passthrough,
};
use std::process;
use tracing::info;

/// Section types the host draws natively from forwarded props.
const SECTION_COMPONENTS: &[&str] = &[
    "DashboardHeader",
    "WalletCard",
    "HeroBanner",
    "ServicesGrid",
    "BusinessSection",
    "GenericGridSection",
    "SuppliersSection",
    "CommunitySection",
    "EngagementSection",
    "MarketplaceHeader",
    "CategoryCarousel",
    "ShopCardCarousel",
    "PromosSection",
    "FeaturedSection",
    "TrustSection",
    "CommunitySupportCard",
    "SectionDivider",
    "OnboardingSlide",
    "AppWelcomeScreen",
];

fn main() {
    if let Err(err) = run() {
        eprintln!("sdui_shell fatal error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), HostError> {
    let config = ShellConfig::from_env()?;
    logging::init(config.log_level)?;

    let registry = build_registry();
    info!(components = registry.len(), "component registry built");

    sdui_shell_runtime::run(registry, config)
}

fn build_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    register_builtin_components(&mut registry);
    for kind in SECTION_COMPONENTS {
        register_passthrough(&mut registry, kind);
    }
    registry
}
