pub mod load_balancer;
