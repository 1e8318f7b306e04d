//! 测试
//!
//! 在宿主机上用模拟端口驱动调度器，每个测试文件覆盖一个模块，
//! `test_scenario` 和 `test_property` 覆盖整体行为。


mod test_idle;
mod test_kservice;
mod test_property;
