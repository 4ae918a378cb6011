fn main() {
    println!("cargo:rerun-if-changed=conf.txt");

    // Host builds (tests, fuzzing) carry no ESP-IDF toolchain.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
