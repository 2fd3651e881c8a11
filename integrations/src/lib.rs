mod test_epir;
