mod debug_invariants;
mod traversal;
