use core_aterm::ATerm;
use core_aterm::Symbol;
use core_aterm::Term;

fn main() {
    let term = {
        let t = ATerm::constant(&Symbol::new("a", 0));
        t.arg(0)
    };

    // Have some side effect
    println!("Term: {:?}", term);
}