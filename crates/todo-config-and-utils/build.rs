fn main() {
    // Recompile when the compile-time backend defaults change.
    // Without this, option_env!() values get cached and won't update.
    println!("cargo:rerun-if-env-changed=SUPABASE_URL");
    println!("cargo:rerun-if-env-changed=SUPABASE_PUBLISHABLE_KEY");
}
