fn main() {
    candela::run();
}
